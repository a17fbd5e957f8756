/// Process exit codes.
pub mod exit {
    pub const SUCCESS: i32 = 0;
    pub const OPERATIONAL_FAILURE: i32 = 1;
    pub const INVALID_INPUT: i32 = 2;
    pub const CANCELLED: i32 = 3;
}
