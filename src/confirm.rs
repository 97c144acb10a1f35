/// Asks the user a yes/no question before the batch starts downloading.
pub trait Confirm {
    /// Return `true` when the user approves
    fn confirm(&self, message: &str) -> bool;
}

/// Approves every question without asking.
#[derive(Debug, Default, Clone, Copy)]
pub struct AssumeYes;

impl Confirm for AssumeYes {
    fn confirm(&self, _message: &str) -> bool {
        true
    }
}
