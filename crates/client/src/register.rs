//! Client-orchestrated registration flow
//!
//! The server treats OTP verification as a pure gate; the ordering
//! `Idle → OtpRequested → OtpVerified → Registered` and the bounded retry
//! on verification are enforced here, on the client only. After
//! [`MAX_OTP_ATTEMPTS`] failed verifications the flow locks until a fresh
//! code is requested.

pub const MAX_OTP_ATTEMPTS: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationStage {
    Idle,
    OtpRequested,
    OtpVerified,
    Registered,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum FlowError {
    /// The attempted transition skipped a gate
    #[error("operation not allowed in the {0:?} stage")]
    WrongStage(RegistrationStage),
    /// Too many failed verifications; request a new OTP first
    #[error("too many failed attempts, request a new OTP")]
    LockedOut,
}

/// Per-registration-attempt state machine.
#[derive(Debug)]
pub struct RegistrationFlow {
    stage: RegistrationStage,
    failed_attempts: u32,
}

impl RegistrationFlow {
    pub fn new() -> Self {
        Self {
            stage: RegistrationStage::Idle,
            failed_attempts: 0,
        }
    }

    pub fn stage(&self) -> RegistrationStage {
        self.stage
    }

    pub fn is_locked_out(&self) -> bool {
        self.failed_attempts >= MAX_OTP_ATTEMPTS
    }

    pub fn remaining_attempts(&self) -> u32 {
        MAX_OTP_ATTEMPTS.saturating_sub(self.failed_attempts)
    }

    /// Record that a code was sent. Valid from `Idle` (first send) and from
    /// `OtpRequested` (resend, which also lifts a lockout).
    pub fn otp_sent(&mut self) -> Result<(), FlowError> {
        match self.stage {
            RegistrationStage::Idle | RegistrationStage::OtpRequested => {
                self.stage = RegistrationStage::OtpRequested;
                self.failed_attempts = 0;
                Ok(())
            }
            stage => Err(FlowError::WrongStage(stage)),
        }
    }

    /// Record the outcome of a verification attempt.
    pub fn otp_result(&mut self, verified: bool) -> Result<(), FlowError> {
        if self.stage != RegistrationStage::OtpRequested {
            return Err(FlowError::WrongStage(self.stage));
        }
        if self.is_locked_out() {
            return Err(FlowError::LockedOut);
        }

        if verified {
            self.stage = RegistrationStage::OtpVerified;
            self.failed_attempts = 0;
        } else {
            self.failed_attempts += 1;
        }
        Ok(())
    }

    /// True once the OTP gate has been passed.
    pub fn can_register(&self) -> bool {
        self.stage == RegistrationStage::OtpVerified
    }

    /// Record a successful registration call.
    pub fn registered(&mut self) -> Result<(), FlowError> {
        if self.stage != RegistrationStage::OtpVerified {
            return Err(FlowError::WrongStage(self.stage));
        }
        self.stage = RegistrationStage::Registered;
        Ok(())
    }
}

impl Default for RegistrationFlow {
    fn default() -> Self {
        Self::new()
    }
}
