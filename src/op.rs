//! The closed enumeration of XenStore operation codes.

/// All 21 operations recognized by the XenStore wire protocol, in
/// their fixed wire order. `Op::Restrict as i32 == 20`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[repr(i32)]
pub enum Op {
    Debug = 0,
    Directory = 1,
    Read = 2,
    GetPerms = 3,
    Watch = 4,
    Unwatch = 5,
    TransactionStart = 6,
    TransactionEnd = 7,
    Introduce = 8,
    Release = 9,
    GetDomainPath = 10,
    Write = 11,
    Mkdir = 12,
    Rm = 13,
    SetPerms = 14,
    WatchEvent = 15,
    Error = 16,
    IsIntroduced = 17,
    Resume = 18,
    SetTarget = 19,
    Restrict = 20,
}

/// Declares the total `ALL` table and the `of_i32`/`to_i32`/`to_str`
/// impls for a closed, contiguously-numbered wire enum, via a match arm
/// per variant in each direction.
macro_rules! impl_from_wire {
    ($name:ident { $($variant:ident = $value:expr => $text:expr),+ $(,)? }) => {
        impl $name {
            /// All operations, indexed by their wire code.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Canonical upper-snake-case wire name, e.g. `GET_DOMAIN_PATH`.
            pub fn to_str(self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }

            /// The fixed wire code for this operation.
            pub fn to_i32(self) -> i32 {
                self as i32
            }

            /// Decode a wire code. Unknown codes are a value (`None`),
            /// never a panic.
            pub fn of_i32(i: i32) -> Option<$name> {
                match i {
                    $($value => Some($name::$variant),)+
                    _ => None,
                }
            }
        }
    };
}

impl_from_wire!(Op {
    Debug = 0 => "DEBUG",
    Directory = 1 => "DIRECTORY",
    Read = 2 => "READ",
    GetPerms = 3 => "GET_PERMS",
    Watch = 4 => "WATCH",
    Unwatch = 5 => "UNWATCH",
    TransactionStart = 6 => "TRANSACTION_START",
    TransactionEnd = 7 => "TRANSACTION_END",
    Introduce = 8 => "INTRODUCE",
    Release = 9 => "RELEASE",
    GetDomainPath = 10 => "GET_DOMAIN_PATH",
    Write = 11 => "WRITE",
    Mkdir = 12 => "MKDIR",
    Rm = 13 => "RM",
    SetPerms = 14 => "SET_PERMS",
    WatchEvent = 15 => "WATCH_EVENT",
    Error = 16 => "ERROR",
    IsIntroduced = 17 => "IS_INTRODUCED",
    Resume = 18 => "RESUME",
    SetTarget = 19 => "SET_TARGET",
    Restrict = 20 => "RESTRICT",
});

impl std::fmt::Display for Op {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.to_str())
    }
}
