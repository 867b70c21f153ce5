/// A verified poster, as handed out by the login flow once the email has been
/// checked against the allow-list
#[derive(Clone, Debug, Eq, Hash, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Identity {
    pub username: String,
    pub email: String,
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct EmailVerification {
    pub allowed: bool,

    /// Unset for allow-listed members who never picked a username yet
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct UsernameAssignment {
    pub email: String,
    pub username: String,
}
