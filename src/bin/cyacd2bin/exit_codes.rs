pub const EXIT_OK: i32 = 0;
pub const EXIT_INVALID_INPUT: i32 = 11;
pub const EXIT_WRITE_FAILED: i32 = 12;
pub const EXIT_SAME_FILE: i32 = 13;
pub const EXIT_UNEXPECTED: i32 = 20;
