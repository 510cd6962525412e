use super::jurisdiction::LoginMethod;

///
/// A single login request - built per call and discarded once resolved.
///
#[derive(Clone, Debug)]
pub struct LoginAttempt {
    pub email: String,

    /// The jurisdiction name from the request metadata. None means the caller
    /// didn't send one, which is a caller error not a lookup failure.
    pub jurisdiction: Option<String>,

    pub credential: Credential,
}

#[derive(Clone, Debug)]
pub enum Credential {
    Password(String),
    SingleUseCode(String),
}

impl Credential {
    pub fn method(&self) -> LoginMethod {
        match self {
            Credential::Password(_) => LoginMethod::Password,
            Credential::SingleUseCode(_) => LoginMethod::SingleUseCode,
        }
    }
}
