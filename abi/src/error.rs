//! Kernel error taxonomies.
//!
//! Both enums follow the convention described in spec §7: success is zero,
//! every failure mode is a small negative integer, and handlers at an FFI or
//! trap-frame boundary return the integer form directly.

/// Implements `as_c_int`/`from_c_int`/`is_success`/`is_error` for a
/// `#[repr(i32)]` kernel error enum. Mirrors the teacher's
/// `impl_kernel_error!` macro in `abi/src/error.rs`.
macro_rules! impl_kernel_error {
    ($ty:ty, fallback: $fallback:ident, variants: { $($val:literal => $variant:ident),* $(,)? }) => {
        impl $ty {
            #[inline]
            pub const fn as_c_int(self) -> i32 {
                self as i32
            }

            #[inline]
            pub const fn from_c_int(val: i32) -> Self {
                match val {
                    $($val => Self::$variant,)*
                    _ => Self::$fallback,
                }
            }

            #[inline]
            pub const fn is_success(self) -> bool {
                matches!(self, Self::Success)
            }

            #[inline]
            pub const fn is_error(self) -> bool {
                !self.is_success()
            }
        }
    };
}

/// Error codes returned by syscall handlers, placed in a trap frame's return
/// slot. See spec §4.3 "Error code convention".
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyscallError {
    #[default]
    Success = 0,
    InvalidArgument = -1,
    OutOfMemory = -2,
    NoSuchEntry = -3,
    PermissionDenied = -4,
    Busy = -5,
    TryAgain = -6,
    Generic = -7,
}

impl_kernel_error!(SyscallError, fallback: Generic, variants: {
    0 => Success,
    -1 => InvalidArgument,
    -2 => OutOfMemory,
    -3 => NoSuchEntry,
    -4 => PermissionDenied,
    -5 => Busy,
    -6 => TryAgain,
    -7 => Generic,
});

/// Last-error field for the in-memory filesystem (spec §4.4).
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FsError {
    #[default]
    Success = 0,
    NullPointer = -1,
    InvalidInput = -2,
    BufferOverflow = -3,
    NotFound = -4,
    AlreadyExists = -5,
    NoSpace = -6,
    PermissionDenied = -7,
    NameTooLong = -8,
    InvalidOperation = -9,
    Unknown = -10,
}

impl_kernel_error!(FsError, fallback: Unknown, variants: {
    0 => Success,
    -1 => NullPointer,
    -2 => InvalidInput,
    -3 => BufferOverflow,
    -4 => NotFound,
    -5 => AlreadyExists,
    -6 => NoSpace,
    -7 => PermissionDenied,
    -8 => NameTooLong,
    -9 => InvalidOperation,
    -10 => Unknown,
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn syscall_error_round_trips_through_c_int() {
        for err in [
            SyscallError::Success,
            SyscallError::InvalidArgument,
            SyscallError::OutOfMemory,
            SyscallError::NoSuchEntry,
            SyscallError::PermissionDenied,
            SyscallError::Busy,
            SyscallError::TryAgain,
            SyscallError::Generic,
        ] {
            assert_eq!(SyscallError::from_c_int(err.as_c_int()), err);
        }
    }

    #[test]
    fn unknown_code_falls_back() {
        assert_eq!(SyscallError::from_c_int(-99), SyscallError::Generic);
        assert_eq!(FsError::from_c_int(-99), FsError::Unknown);
    }

    #[test]
    fn success_is_zero() {
        assert!(SyscallError::Success.is_success());
        assert!(!SyscallError::InvalidArgument.is_success());
        assert!(FsError::Success.is_success());
    }
}
