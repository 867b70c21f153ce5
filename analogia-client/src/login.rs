//! Email allow-list login: the member types their email, which gets checked
//! against the member directory, then picks a username if they never did.

use crate::{
    api::{self, Identity, IdentityVerifier},
    IdentitySession,
};

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum LoginStep {
    EnterEmail,
    ChooseUsername { email: String },
    LoggedIn(Identity),
    Rejected { email: String },
}

impl LoginStep {
    pub fn initial(session: &IdentitySession) -> LoginStep {
        match session.read() {
            Some(i) => LoginStep::LoggedIn(i),
            None => LoginStep::EnterEmail,
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum LoginError {
    #[error("{0:?} is not a valid email address")]
    InvalidEmail(String),

    #[error("Usernames must be between 1 and {} characters long", api::MAX_USERNAME_LEN)]
    InvalidUsername,

    #[error("Username {0:?} is already taken")]
    UsernameTaken(String),

    #[error("Could not reach the member directory, please try again")]
    Unavailable,
}

fn normalize_email(email: &str) -> Result<String, LoginError> {
    let email = email.trim();
    match email.split_once('@') {
        Some((user, domain)) if !user.is_empty() && domain.contains('.') && !email.contains(' ') => {
            Ok(String::from(email))
        }
        _ => Err(LoginError::InvalidEmail(String::from(email))),
    }
}

pub async fn submit_email<V>(
    verifier: &V,
    session: &IdentitySession,
    email: &str,
) -> Result<LoginStep, LoginError>
where
    V: ?Sized + IdentityVerifier,
{
    let email = normalize_email(email)?;
    let verification = verifier.verify_email(&email).await.map_err(|e| {
        tracing::error!("failed verifying email: {e}");
        LoginError::Unavailable
    })?;
    Ok(match verification {
        api::EmailVerification { allowed: false, .. } => {
            tracing::info!(%email, "email is not allow-listed");
            LoginStep::Rejected { email }
        }
        api::EmailVerification {
            username: Some(username),
            ..
        } => LoginStep::LoggedIn(session.set(username, email)),
        api::EmailVerification { username: None, .. } => LoginStep::ChooseUsername { email },
    })
}

/// Second step, for allow-listed members who do not have a username yet
pub async fn submit_username<V>(
    verifier: &V,
    session: &IdentitySession,
    email: &str,
    username: &str,
) -> Result<LoginStep, LoginError>
where
    V: ?Sized + IdentityVerifier,
{
    let username = username.trim();
    api::validate_username(username).map_err(|_| LoginError::InvalidUsername)?;
    match verifier.assign_username(email, username).await {
        Ok(()) => Ok(LoginStep::LoggedIn(
            session.set(String::from(username), String::from(email)),
        )),
        Err(api::Error::NameAlreadyUsed(n)) => Err(LoginError::UsernameTaken(n)),
        Err(api::Error::InvalidName(_)) => Err(LoginError::InvalidUsername),
        Err(api::Error::EmailNotAllowed(_)) => Ok(LoginStep::Rejected {
            email: String::from(email),
        }),
        Err(e) => {
            tracing::error!("failed assigning username: {e}");
            Err(LoginError::Unavailable)
        }
    }
}

pub fn logout(session: &IdentitySession) -> LoginStep {
    session.clear();
    LoginStep::EnterEmail
}

#[cfg(test)]
mod tests {
    use super::*;
    use analogia_mock_server::MockServer;

    #[test]
    fn email_shape() {
        assert_eq!(
            normalize_email("  ada@example.org "),
            Ok(String::from("ada@example.org"))
        );
        assert!(normalize_email("ada").is_err());
        assert!(normalize_email("@example.org").is_err());
        assert!(normalize_email("ada@localhost").is_err());
        assert!(normalize_email("a da@example.org").is_err());
    }

    #[tokio::test]
    async fn known_member_logs_in_directly() {
        let server = MockServer::new();
        server.admin_allow_email("ada@example.org", Some("ada"));
        let session = IdentitySession::in_memory();
        assert_eq!(LoginStep::initial(&session), LoginStep::EnterEmail);

        let step = submit_email(&server, &session, "ada@example.org")
            .await
            .unwrap();
        let ada = Identity {
            username: String::from("ada"),
            email: String::from("ada@example.org"),
        };
        assert_eq!(step, LoginStep::LoggedIn(ada.clone()));
        assert_eq!(session.read(), Some(ada.clone()));
        assert_eq!(LoginStep::initial(&session), LoginStep::LoggedIn(ada));

        assert_eq!(logout(&session), LoginStep::EnterEmail);
        assert_eq!(session.read(), None);
    }

    #[tokio::test]
    async fn unknown_email_is_rejected() {
        let server = MockServer::new();
        let session = IdentitySession::in_memory();
        let step = submit_email(&server, &session, "eve@example.org")
            .await
            .unwrap();
        assert_eq!(
            step,
            LoginStep::Rejected {
                email: String::from("eve@example.org")
            }
        );
        assert!(!session.is_logged_in());

        // malformed emails do not even reach the directory
        assert!(submit_email(&server, &session, "eve").await.is_err());
        assert_eq!(server.test_calls().verify_email, 1);
    }

    #[tokio::test]
    async fn new_member_picks_username_once() {
        let server = MockServer::new();
        server.admin_allow_email("bob@example.org", Some("bob"));
        server.admin_allow_email("cy@example.org", None);
        let session = IdentitySession::in_memory();

        let step = submit_email(&server, &session, "cy@example.org")
            .await
            .unwrap();
        assert_eq!(
            step,
            LoginStep::ChooseUsername {
                email: String::from("cy@example.org")
            }
        );
        assert!(!session.is_logged_in());

        assert_eq!(
            submit_username(&server, &session, "cy@example.org", "  ").await,
            Err(LoginError::InvalidUsername)
        );
        assert_eq!(server.test_calls().assign_username, 0);
        assert_eq!(
            submit_username(&server, &session, "cy@example.org", "bob").await,
            Err(LoginError::UsernameTaken(String::from("bob")))
        );

        let step = submit_username(&server, &session, "cy@example.org", " cy ")
            .await
            .unwrap();
        assert!(matches!(step, LoginStep::LoggedIn(ref i) if i.username == "cy"));
        assert_eq!(server.test_username_of("cy@example.org").as_deref(), Some("cy"));

        // next time around the username is already known
        logout(&session);
        let step = submit_email(&server, &session, "cy@example.org")
            .await
            .unwrap();
        assert!(matches!(step, LoginStep::LoggedIn(_)));
    }

    #[tokio::test]
    async fn directory_down() {
        let server = MockServer::new();
        server.admin_allow_email("ada@example.org", Some("ada"));
        server.fail_next(api::Error::Network(String::from("offline")));
        let session = IdentitySession::in_memory();
        assert_eq!(
            submit_email(&server, &session, "ada@example.org").await,
            Err(LoginError::Unavailable)
        );
        assert!(!session.is_logged_in());
    }
}
