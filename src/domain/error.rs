use thiserror::Error;

/// Failure results surfaced by party store operations.
///
/// The string code is the stable wire contract; mapping codes to HTTP
/// statuses is the API layer's job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PartyError {
    #[error("Party not found")]
    PartyNotFound,
    #[error("Party is locked")]
    PartyLocked,
    #[error("Invalid passcode")]
    InvalidPasscode,
    #[error("Party is full")]
    PartyFull,
    #[error("Only the party owner can do that")]
    Forbidden,
    #[error("The party owner cannot be kicked")]
    CannotKickOwner,
    #[error("Member not found")]
    NotFound,
    #[error("Title must not be empty")]
    InvalidTitle,
    #[error("A passcode is required to lock the party")]
    PasscodeRequired,
}

impl PartyError {
    pub fn code(&self) -> &'static str {
        match self {
            PartyError::PartyNotFound => "PARTY_NOT_FOUND",
            PartyError::PartyLocked => "PARTY_LOCKED",
            PartyError::InvalidPasscode => "INVALID_PASSCODE",
            PartyError::PartyFull => "PARTY_FULL",
            PartyError::Forbidden => "FORBIDDEN",
            PartyError::CannotKickOwner => "CANNOT_KICK_OWNER",
            PartyError::NotFound => "NOT_FOUND",
            PartyError::InvalidTitle => "INVALID_TITLE",
            PartyError::PasscodeRequired => "PASSCODE_REQUIRED",
        }
    }
}
