use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Regex for validating upload folders
    /// One or more segments of letters, digits, `-` or `_`, separated by `/`
    /// - Valid: "images/profile", "tests", "a-b/c_d"
    /// - Invalid: "/images", "images/", "images//profile", "../etc", "my folder"
    pub static ref FOLDER_REGEX: Regex =
        Regex::new(r"^[A-Za-z0-9_-]+(?:/[A-Za-z0-9_-]+)*$").unwrap();

    /// Regex for validating uploaded filenames
    /// No path separators, no leading dot, printable characters only
    /// - Valid: "avatar.png", "photo 1.jpg", "scan_2024-01-01.pdf"
    /// - Invalid: ".env", "a/b.png", "..", ""
    pub static ref FILENAME_REGEX: Regex =
        Regex::new(r"^[A-Za-z0-9_\-()\[\] ][A-Za-z0-9_.\-()\[\] ]{0,254}$").unwrap();

    /// Regex for validating purpose tags
    /// Lowercase alphanumeric with hyphens
    /// - Valid: "profile-image", "test", "chat-attachment"
    /// - Invalid: "-tag", "tag-", "Tag", "tag_name"
    pub static ref PURPOSE_REGEX: Regex = Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").unwrap();

    /// Regex for image resize dimensions, in pixels
    /// - Valid: "1", "100", "4096"
    /// - Invalid: "0", "012", "-5", "100px", "99999"
    pub static ref DIMENSION_REGEX: Regex = Regex::new(r"^[1-9][0-9]{0,3}$").unwrap();
}
