//! Git credential injection into content descriptors.

use tracing::debug;
use wsprep_common::{ExecutionRequest, GitCredentials, TestContent};

/// Copy configured git credentials into the request's repository reference.
///
/// Applies only when credentials are configured and the content is a git
/// repository; any other request passes through untouched. Returns whether
/// the descriptor was modified.
pub fn inject_git_credentials(
    request: &mut ExecutionRequest,
    credentials: Option<&GitCredentials>,
) -> bool {
    let Some(credentials) = credentials else {
        return false;
    };

    match request.content.as_mut() {
        Some(TestContent::Git { repository }) => {
            repository.username.clone_from(&credentials.username);
            repository.token.clone_from(&credentials.token);
            debug!(
                "Injected git credentials for user {} into {}",
                credentials.username,
                wsprep_common::mask_url_credentials(&repository.uri)
            );
            true
        }
        Some(TestContent::String { .. } | TestContent::FileUri { .. }) | None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use wsprep_common::Repository;

    fn creds() -> GitCredentials {
        GitCredentials::new("bot", "tok123").unwrap()
    }

    fn git_request() -> ExecutionRequest {
        ExecutionRequest::new("exec").with_content(TestContent::git(Repository::new(
            "https://github.com/org/repo.git",
        )))
    }

    #[test]
    fn test_injects_into_repository() {
        let mut request = git_request();
        assert!(inject_git_credentials(&mut request, Some(&creds())));

        let repo = request.repository_mut().unwrap();
        assert_eq!(repo.username, "bot");
        assert_eq!(repo.token, "tok123");
    }

    #[test]
    fn test_no_credentials_leaves_repository() {
        let mut request = git_request();
        let before = request.clone();
        assert!(!inject_git_credentials(&mut request, None));
        assert_eq!(request, before);
    }

    #[test]
    fn test_overwrites_existing_credentials() {
        let mut request = git_request();
        {
            let repo = request.repository_mut().unwrap();
            repo.username = "someone".to_string();
            repo.token = "old".to_string();
        }
        inject_git_credentials(&mut request, Some(&creds()));
        let repo = request.repository_mut().unwrap();
        assert_eq!(repo.username, "bot");
        assert_eq!(repo.token, "tok123");
    }

    #[test]
    fn test_absent_content_is_noop() {
        let mut request = ExecutionRequest::new("exec");
        assert!(!inject_git_credentials(&mut request, Some(&creds())));
        assert!(request.content.is_none());
    }

    fn non_git_content() -> impl Strategy<Value = Option<TestContent>> {
        prop_oneof![
            Just(None),
            ".{0,40}".prop_map(|data| Some(TestContent::string(data))),
            "[a-z]{1,8}://[a-z./]{0,20}".prop_map(|uri| Some(TestContent::file_uri(uri))),
        ]
    }

    proptest! {
        #[test]
        fn test_non_git_content_never_changes(
            content in non_git_content(),
            user in "[a-z]{0,8}",
            token in "[a-zA-Z0-9]{0,12}",
        ) {
            let mut request = ExecutionRequest::new("exec");
            request.content = content;
            let before = request.clone();

            let credentials = GitCredentials::new(user, token);
            prop_assert!(!inject_git_credentials(&mut request, credentials.as_ref()));
            prop_assert_eq!(request, before);
        }

        #[test]
        fn test_injection_is_idempotent(
            user in "[a-z]{1,8}",
            token in "[a-zA-Z0-9]{1,12}",
        ) {
            let credentials = GitCredentials::new(user.clone(), token.clone());
            let mut once = git_request();
            inject_git_credentials(&mut once, credentials.as_ref());
            let mut twice = once.clone();
            inject_git_credentials(&mut twice, credentials.as_ref());

            prop_assert_eq!(&once, &twice);
            let repo = twice.repository_mut().unwrap();
            prop_assert_eq!(&repo.username, &user);
            prop_assert_eq!(&repo.token, &token);
        }
    }
}
