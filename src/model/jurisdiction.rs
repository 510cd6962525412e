use serde::{Deserialize, Serialize};

///
/// A tenant-like administrative boundary. Which login methods are available is a
/// per-jurisdiction policy decision - read-only as far as the login path goes.
///
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Jurisdiction {
    pub jurisdiction_id: String,
    pub name: String,
    #[serde(default)]
    pub allow_single_use_code_login: bool,
}

///
/// The login method a caller is attempting - used to match against the
/// jurisdiction's policy flags before any account is looked-up.
///
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LoginMethod {
    Password,
    SingleUseCode,
}
