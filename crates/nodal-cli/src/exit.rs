use nodal_algo::LpStatus;

/// Process exit codes of the `nodal` binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitCode {
    /// Optimal dispatch found (or a non-solving command succeeded)
    Success = 0,
    /// I/O, parse, model or backend failure
    Failure = 1,
    Infeasible = 2,
    Unbounded = 3,
    IterationLimitExceeded = 4,
}

impl ExitCode {
    pub fn from_status(status: LpStatus) -> Self {
        match status {
            LpStatus::Optimal => ExitCode::Success,
            LpStatus::Infeasible => ExitCode::Infeasible,
            LpStatus::Unbounded => ExitCode::Unbounded,
            LpStatus::IterationLimitExceeded => ExitCode::IterationLimitExceeded,
        }
    }

    pub fn code(self) -> u8 {
        self as u8
    }
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> Self {
        std::process::ExitCode::from(code.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(ExitCode::from_status(LpStatus::Optimal).code(), 0);
        assert_eq!(ExitCode::from_status(LpStatus::Infeasible).code(), 2);
        assert_eq!(ExitCode::from_status(LpStatus::Unbounded).code(), 3);
        assert_eq!(
            ExitCode::from_status(LpStatus::IterationLimitExceeded).code(),
            4
        );
        assert_eq!(ExitCode::Failure.code(), 1);
    }
}
