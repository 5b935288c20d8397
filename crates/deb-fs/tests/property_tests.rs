use deb_fs::{compute_content_checksum, compute_file_checksum, io};
use proptest::prelude::*;

proptest! {
    #[test]
    fn test_write_then_read_is_identity(s in "\\PC*") {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("file");

        io::write_atomic(&path, s.as_bytes()).unwrap();

        prop_assert_eq!(io::read_text(&path).unwrap(), s.clone());
        prop_assert_eq!(
            compute_file_checksum(&path).unwrap(),
            Some(compute_content_checksum(&s))
        );
    }
}
