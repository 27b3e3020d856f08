use crate::{
    service::{ContentService, PostInput, UNCHANGED_IMAGE, UserInput, error::ServiceError},
    storage::{DiskImageStorage, ImageStorage},
};
use bulletin_common::{
    model::{
        Id,
        auth::{Identity, TokenKeys},
        post::Post,
        user::User,
    },
    object_id::{ObjectId, ObjectIdGenerator},
};
use bulletin_db::memory::MemoryStore;
use tempfile::TempDir;

type TestService = ContentService<MemoryStore, DiskImageStorage>;

struct Fixture {
    service: TestService,
    dir: TempDir,
}

fn fixture() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let service = ContentService::new(
        MemoryStore::new(ObjectIdGenerator::new([1; 5], 0)),
        DiskImageStorage::new(dir.path().join("images")),
        TokenKeys::from_secret("somesupersecretsecret"),
    );

    Fixture { service, dir }
}

fn user_input(email: &str, password: &str) -> UserInput {
    UserInput {
        email: email.to_owned(),
        name: "Alice".to_owned(),
        password: password.to_owned(),
    }
}

fn post_input(title: &str) -> PostInput {
    PostInput {
        title: title.to_owned(),
        content: "Some meaningful content".to_owned(),
        image_url: None,
    }
}

async fn sign_up(service: &TestService, email: &str) -> (User, Identity) {
    let user = service.register(user_input(email, "secret123")).await.unwrap();
    let auth = service.login(email, "secret123".to_owned()).await.unwrap();
    let identity = service.tokens().resolve(&auth.token);

    (user, identity)
}

fn stranger() -> Identity {
    Identity::Authenticated {
        id: Id::new(ObjectId::from_parts(1, [9; 5], 9)),
        email: "ghost@example.com".to_owned(),
    }
}

#[tokio::test]
async fn register_then_login() {
    let Fixture { service, dir: _dir } = fixture();

    let user = service
        .register(user_input("alice@example.com", "secret123"))
        .await
        .unwrap();
    assert_eq!(user.email.get(), "alice@example.com");
    assert_eq!(user.status, "I am new!");
    assert!(user.posts.is_empty());

    let json = serde_json::to_value(&user).unwrap();
    let object = json.as_object().unwrap();
    assert!(object.keys().all(|key| !key.contains("password")));
    assert_eq!(object["id"], user.id.to_string());

    let duplicate = service
        .register(user_input("alice@example.com", "secret123"))
        .await
        .unwrap_err();
    assert!(matches!(duplicate, ServiceError::UserExists));
    assert_eq!(duplicate.to_string(), "User exists already!");
    assert_eq!(duplicate.code(), None);
    assert_eq!(duplicate.status(), 500);

    let wrong = service
        .login("alice@example.com", "wrong-password".to_owned())
        .await
        .unwrap_err();
    assert!(matches!(wrong, ServiceError::WrongPassword));
    assert_eq!(wrong.status(), 401);
    assert_eq!(wrong.to_string(), "Invalid Password");

    let auth = service
        .login("alice@example.com", "secret123".to_owned())
        .await
        .unwrap();
    assert_eq!(auth.user_id, user.id);
    assert_eq!(service.tokens().resolve(&auth.token).user_id(), Some(user.id));
}

#[tokio::test]
async fn duplicate_registration_creates_no_user() {
    let Fixture { service, dir: _dir } = fixture();

    service
        .register(user_input("alice@example.com", "secret123"))
        .await
        .unwrap();
    let result = service
        .register(user_input("ALICE@example.com ", "other-password"))
        .await;

    assert!(matches!(result, Err(ServiceError::UserExists)));
    assert_eq!(service.store().user_count(), 1);
}

#[tokio::test]
async fn invalid_registration_reports_every_problem() {
    let Fixture { service, dir: _dir } = fixture();

    let err = service
        .register(user_input("alice", "abc"))
        .await
        .unwrap_err();

    assert_eq!(err.status(), 422);
    assert_eq!(err.to_string(), "Invalid input.");
    assert_eq!(err.details().len(), 2);
    assert_eq!(service.store().user_count(), 0);
}

#[tokio::test]
async fn login_with_unknown_email_fails() {
    let Fixture { service, dir: _dir } = fixture();

    for email in ["nobody@example.com", "not-an-email"] {
        let err = service.login(email, "secret123".to_owned()).await.unwrap_err();
        assert!(matches!(err, ServiceError::UnknownEmail));
        assert_eq!(err.status(), 401);
    }
}

#[tokio::test]
async fn anonymous_users_cannot_post() {
    let Fixture { service, dir: _dir } = fixture();

    let err = service
        .create_post(&Identity::Anonymous, post_input("A title"))
        .await
        .unwrap_err();

    assert!(matches!(err, ServiceError::NotAuthenticated));
    assert_eq!(err.status(), 401);
    assert_eq!(service.store().post_count(), 0);
}

#[tokio::test]
async fn protected_operations_reject_anonymous() {
    let Fixture { service, dir: _dir } = fixture();
    let anonymous = Identity::Anonymous;
    let post_id = ObjectId::default().to_string();

    let errors = [
        service.list_posts(&anonymous, None).await.unwrap_err(),
        service.get_post(&anonymous, &post_id).await.unwrap_err(),
        service
            .update_post(&anonymous, &post_id, post_input("A title"))
            .await
            .unwrap_err(),
        service.delete_post(&anonymous, &post_id).await.unwrap_err(),
        service.current_user(&anonymous).await.unwrap_err(),
        service
            .update_status(&anonymous, "Busy".to_owned())
            .await
            .unwrap_err(),
    ];

    for err in errors {
        assert!(matches!(err, ServiceError::NotAuthenticated), "{err:?}");
    }
}

#[tokio::test]
async fn create_post_links_creator() {
    let Fixture { service, dir: _dir } = fixture();
    let (user, identity) = sign_up(&service, "alice@example.com").await;

    let post = service
        .create_post(&identity, post_input("First post"))
        .await
        .unwrap();

    assert_eq!(post.creator.id, user.id);
    assert_eq!(post.creator.posts, vec![post.id]);
    assert_eq!(post.content.title, "First post");
    assert_eq!(post.created_at, post.updated_at);

    let current = service.current_user(&identity).await.unwrap();
    assert_eq!(current.posts, vec![post.id]);
}

#[tokio::test]
async fn create_post_validates_input() {
    let Fixture { service, dir: _dir } = fixture();
    let (_, identity) = sign_up(&service, "alice@example.com").await;

    let err = service
        .create_post(
            &identity,
            PostInput {
                title: "Hi".to_owned(),
                content: String::new(),
                image_url: None,
            },
        )
        .await
        .unwrap_err();

    assert_eq!(err.status(), 422);
    assert_eq!(err.details().len(), 2);
    assert_eq!(service.store().post_count(), 0);
}

#[tokio::test]
async fn create_post_requires_existing_user() {
    let Fixture { service, dir: _dir } = fixture();

    let err = service
        .create_post(&stranger(), post_input("A title"))
        .await
        .unwrap_err();

    assert!(matches!(err, ServiceError::InvalidUser));
    assert_eq!(err.status(), 401);
    assert_eq!(service.store().post_count(), 0);
}

#[tokio::test]
async fn posts_are_listed_newest_first() {
    let Fixture { service, dir: _dir } = fixture();
    let (_, identity) = sign_up(&service, "alice@example.com").await;

    let mut created: Vec<Post> = Vec::new();
    for index in 0..5 {
        let post = service
            .create_post(&identity, post_input(&format!("Post number {index}")))
            .await
            .unwrap();
        created.push(post);
    }

    let first = service.list_posts(&identity, Some(1)).await.unwrap();
    assert_eq!(first.total_posts, 5);
    let ids: Vec<_> = first.posts.iter().map(|post| post.id).collect();
    assert_eq!(ids, vec![created[4].id, created[3].id]);
    assert!(
        first
            .posts
            .windows(2)
            .all(|pair| pair[0].created_at >= pair[1].created_at)
    );

    let default_page = service.list_posts(&identity, None).await.unwrap();
    assert_eq!(default_page, first);
    let below_one = service.list_posts(&identity, Some(0)).await.unwrap();
    assert_eq!(below_one, first);

    let last = service.list_posts(&identity, Some(3)).await.unwrap();
    assert_eq!(last.total_posts, 5);
    assert_eq!(last.posts.len(), 1);
    assert_eq!(last.posts[0].id, created[0].id);

    let beyond = service.list_posts(&identity, Some(4)).await.unwrap();
    assert!(beyond.posts.is_empty());
}

#[tokio::test]
async fn missing_posts_are_not_found() {
    let Fixture { service, dir: _dir } = fixture();
    let (_, identity) = sign_up(&service, "alice@example.com").await;

    let unknown = ObjectId::from_parts(1, [2; 5], 3).to_string();
    for post_id in [unknown.as_str(), "definitely-not-an-id"] {
        let err = service.get_post(&identity, post_id).await.unwrap_err();
        assert!(matches!(err, ServiceError::PostNotFound));
        assert_eq!(err.status(), 404);
        assert_eq!(err.to_string(), "No post found!");
    }
}

#[tokio::test]
async fn only_the_creator_may_update() {
    let Fixture { service, dir: _dir } = fixture();
    let (_, alice) = sign_up(&service, "alice@example.com").await;
    let (_, bob) = sign_up(&service, "bob@example.com").await;

    let post = service
        .create_post(&alice, post_input("Alice's post"))
        .await
        .unwrap();
    let post_id = post.id.to_string();

    let err = service
        .update_post(&bob, &post_id, post_input("Bob was here"))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Forbidden));
    assert_eq!(err.status(), 403);

    let unchanged = service.get_post(&alice, &post_id).await.unwrap();
    assert_eq!(unchanged.content, post.content);
    assert_eq!(unchanged.updated_at, post.updated_at);

    // Ownership is checked before the input.
    let err = service
        .update_post(&bob, &post_id, post_input(""))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Forbidden));

    let err = service
        .update_post(&alice, &post_id, post_input(""))
        .await
        .unwrap_err();
    assert_eq!(err.status(), 422);
}

#[tokio::test]
async fn update_keeps_image_for_placeholder() {
    let Fixture { service, dir: _dir } = fixture();
    let (_, identity) = sign_up(&service, "alice@example.com").await;

    let post = service
        .create_post(
            &identity,
            PostInput {
                image_url: Some("images/old.png".to_owned()),
                ..post_input("With image")
            },
        )
        .await
        .unwrap();
    let post_id = post.id.to_string();

    let kept = service
        .update_post(
            &identity,
            &post_id,
            PostInput {
                image_url: Some(UNCHANGED_IMAGE.to_owned()),
                ..post_input("New title")
            },
        )
        .await
        .unwrap();
    assert_eq!(kept.content.title, "New title");
    assert_eq!(kept.content.image_url.as_deref(), Some("images/old.png"));
    assert_eq!(kept.created_at, post.created_at);
    assert!(kept.updated_at >= post.updated_at);

    let replaced = service
        .update_post(
            &identity,
            &post_id,
            PostInput {
                image_url: Some("images/new.png".to_owned()),
                ..post_input("Newer title")
            },
        )
        .await
        .unwrap();
    assert_eq!(replaced.content.image_url.as_deref(), Some("images/new.png"));
}

#[tokio::test]
async fn only_the_creator_may_delete() {
    let Fixture { service, dir: _dir } = fixture();
    let (_, alice) = sign_up(&service, "alice@example.com").await;
    let (_, bob) = sign_up(&service, "bob@example.com").await;

    let post = service
        .create_post(&alice, post_input("Alice's post"))
        .await
        .unwrap();

    let err = service
        .delete_post(&bob, &post.id.to_string())
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Forbidden));

    assert_eq!(service.store().post_count(), 1);
    assert!(service.get_post(&alice, &post.id.to_string()).await.is_ok());
}

#[tokio::test]
async fn delete_removes_post_reference_and_image() {
    let Fixture { service, dir } = fixture();
    let (_, identity) = sign_up(&service, "alice@example.com").await;

    let storage = DiskImageStorage::new(dir.path().join("images"));
    let image_url = storage.store(b"png bytes", "cat.png").await.unwrap();
    let image_file = storage.root().join(image_url.rsplit('/').next().unwrap());
    assert!(image_file.exists());

    let kept = service
        .create_post(&identity, post_input("Stays around"))
        .await
        .unwrap();
    let doomed = service
        .create_post(
            &identity,
            PostInput {
                image_url: Some(image_url),
                ..post_input("Goes away")
            },
        )
        .await
        .unwrap();
    let doomed_id = doomed.id.to_string();

    assert!(service.delete_post(&identity, &doomed_id).await.unwrap());

    assert!(!image_file.exists());
    assert_eq!(service.store().post_count(), 1);
    assert_eq!(
        service.current_user(&identity).await.unwrap().posts,
        vec![kept.id]
    );

    let err = service.get_post(&identity, &doomed_id).await.unwrap_err();
    assert!(matches!(err, ServiceError::PostNotFound));
    let err = service.delete_post(&identity, &doomed_id).await.unwrap_err();
    assert!(matches!(err, ServiceError::PostNotFound));
}

#[tokio::test]
async fn delete_succeeds_when_image_is_missing() {
    let Fixture { service, dir: _dir } = fixture();
    let (_, identity) = sign_up(&service, "alice@example.com").await;

    let post = service
        .create_post(
            &identity,
            PostInput {
                image_url: Some("images/never-stored.png".to_owned()),
                ..post_input("Lost image")
            },
        )
        .await
        .unwrap();

    assert!(
        service
            .delete_post(&identity, &post.id.to_string())
            .await
            .unwrap()
    );
    assert_eq!(service.store().post_count(), 0);
}

#[tokio::test]
async fn status_updates_are_persisted() {
    let Fixture { service, dir: _dir } = fixture();
    let (user, identity) = sign_up(&service, "alice@example.com").await;

    let updated = service
        .update_status(&identity, "Writing Rust".to_owned())
        .await
        .unwrap();
    assert_eq!(updated.id, user.id);
    assert_eq!(updated.status, "Writing Rust");

    let current = service.current_user(&identity).await.unwrap();
    assert_eq!(current.status, "Writing Rust");
}

#[tokio::test]
async fn vanished_users_are_invalid() {
    let Fixture { service, dir: _dir } = fixture();

    let err = service.current_user(&stranger()).await.unwrap_err();
    assert!(matches!(err, ServiceError::InvalidUser));
    assert_eq!(err.status(), 401);

    let err = service
        .update_status(&stranger(), "Hello".to_owned())
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidUser));
}
