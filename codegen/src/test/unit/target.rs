use std::str::FromStr;

use test_case::test_case;

use crate::{Arch, Feature, Target};

#[test_case("host", Arch::Host, &[]; "bare_host")]
#[test_case("host-cuda", Arch::Host, &[Feature::Cuda]; "host_cuda")]
#[test_case("x86-cuda-user_context", Arch::X86, &[Feature::Cuda, Feature::UserContext]; "x86_all_features")]
#[test_case("arm-user_context", Arch::Arm, &[Feature::UserContext]; "arm_user_context")]
fn test_target_parse(s: &str, arch: Arch, features: &[Feature]) {
    let target = Target::from_str(s).unwrap();
    assert_eq!(target.arch, arch);
    assert_eq!(target.features().collect::<Vec<_>>(), features);
}

#[test]
fn test_target_display_roundtrip() {
    let target = Target::host().with_feature(Feature::UserContext).with_feature(Feature::Cuda);
    assert_eq!(target.to_string(), "host-cuda-user_context");
    assert_eq!(target.to_string().parse::<Target>().unwrap(), target);
}

#[test]
fn test_target_gpu_feature() {
    assert!(!Target::host().has_gpu_feature());
    assert!(!Target::host().with_feature(Feature::UserContext).has_gpu_feature());
    assert!(Target::host().with_feature(Feature::Cuda).has_gpu_feature());
}

#[test_case("mips"; "unknown_arch")]
#[test_case("host-opencl"; "unknown_feature")]
#[test_case(""; "empty")]
fn test_target_parse_rejects(s: &str) {
    assert!(Target::from_str(s).is_err());
}
