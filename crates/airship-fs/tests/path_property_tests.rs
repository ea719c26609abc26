use airship_fs::{resolve_within, validate_segment};
use proptest::prelude::*;
use std::path::Path;

proptest! {
    #[test]
    fn resolved_paths_stay_under_root(name in "[a-z./\\\\]{0,24}") {
        let root = Path::new("/replica/root");
        if let Ok(resolved) = resolve_within(root, &name) {
            // Whatever the input, a successful resolution never leaves the root
            prop_assert!(resolved.starts_with(root));
            prop_assert!(resolved != root);
        }
    }

    #[test]
    fn plain_segments_validate(segment in "[A-Za-z0-9_~-]{1,32}") {
        prop_assert!(validate_segment(&segment).is_ok());
    }
}

#[test]
fn separators_are_not_segments() {
    assert!(validate_segment("a/b").is_err());
    assert!(validate_segment("..").is_err());
    assert!(validate_segment("").is_err());
    assert!(validate_segment("MQ92743Y4D~com~stoicstudio~BannerSaga").is_ok());
}
