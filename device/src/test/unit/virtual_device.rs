use tessel_codegen::{Extent, Generator, RenderedKernel, ScaleOffset, Target};

use crate::test::tiled_kernel;
use crate::{Backend, Context, Error, VirtualBackend};

fn run(context: &dyn Context, kernel: &RenderedKernel, input: &[f32], extent: Extent) -> Vec<f32> {
    let program = context.load(kernel).unwrap();
    let mut src = context.alloc(extent.len()).unwrap();
    let mut dst = context.alloc(extent.len()).unwrap();
    context.upload(&mut src, input).unwrap();
    program.execute(&src, &mut dst, extent).unwrap();

    let mut out = vec![0.0; extent.len()];
    context.download(&dst, &mut out).unwrap();
    out
}

#[test]
fn test_builder_defaults() {
    assert_eq!(VirtualBackend::builder().build(), VirtualBackend::default());
}

#[test]
fn test_tiled_execution_covers_partial_tiles() {
    let context = VirtualBackend::new(2).create_context(1).unwrap();
    let kernel = tiled_kernel();
    let extent = Extent::new(17, 33);
    let input: Vec<f32> = (0..extent.len()).map(|i| i as f32 * 0.5).collect();

    let out = run(context.as_ref(), &kernel, &input, extent);

    for (i, (&o, &v)) in out.iter().zip(&input).enumerate() {
        assert_eq!(o.to_bits(), (v * 2.0 + 1.0).to_bits(), "element {i}");
    }
}

#[test]
fn test_root_schedule_execution() {
    let context = VirtualBackend::default().create_context(0).unwrap();
    let pipeline = ScaleOffset::default().generate(&Target::host()).unwrap();
    let kernel = RenderedKernel::new(String::new(), pipeline.name.clone(), pipeline.name.clone(), pipeline.expr);
    assert!(kernel.tile.is_none());

    let out = run(context.as_ref(), &kernel, &[0.0, 1.0, -2.0, 3.5], Extent::new(2, 2));
    assert_eq!(out, vec![1.0, 3.0, -3.0, 8.0]);
}

#[test]
fn test_contexts_have_distinct_handles() {
    let backend = VirtualBackend::new(2);
    let (a, b) = (backend.create_context(0).unwrap(), backend.create_context(1).unwrap());
    assert_ne!(a.handle(), b.handle());
    assert_eq!(a.handle(), a.handle());
}

#[test]
fn test_upload_rejects_foreign_memory() {
    let backend = VirtualBackend::new(2);
    let (ctx0, ctx1) = (backend.create_context(0).unwrap(), backend.create_context(1).unwrap());
    let mut memory = ctx1.alloc(4).unwrap();

    let err = ctx0.upload(&mut memory, &[0.0; 4]).unwrap_err();
    assert!(matches!(err, Error::ForeignMemory { .. }));
}

#[test]
fn test_program_rejects_foreign_memory() {
    let backend = VirtualBackend::new(2);
    let (ctx0, ctx1) = (backend.create_context(0).unwrap(), backend.create_context(1).unwrap());
    let program = ctx0.load(&tiled_kernel()).unwrap();
    let src = ctx0.alloc(4).unwrap();
    let mut dst = ctx1.alloc(4).unwrap();

    let err = program.execute(&src, &mut dst, Extent::new(2, 2)).unwrap_err();
    assert!(matches!(err, Error::ForeignMemory { .. }));
}

#[test]
fn test_size_mismatch() {
    let context = VirtualBackend::default().create_context(0).unwrap();
    let mut memory = context.alloc(4).unwrap();
    assert!(matches!(context.upload(&mut memory, &[0.0; 3]), Err(Error::SizeMismatch { expected: 4, actual: 3 })));

    let program = context.load(&tiled_kernel()).unwrap();
    let mut dst = context.alloc(4).unwrap();
    let err = program.execute(&memory, &mut dst, Extent::new(3, 3)).unwrap_err();
    assert!(matches!(err, Error::SizeMismatch { expected: 9, actual: 4 }));
}
