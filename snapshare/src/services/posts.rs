use std::sync::Arc;

use log::{error, info};

use crate::{
    client::SnapshareClient,
    errors::AppError,
    id::generate_document_id,
    live::LiveView,
    models::{Comment, NotificationKind, Post, UserProfile},
    store::{FieldUpdate, SortOrder},
    upload::{ImageUpload, ImageUploader},
};

use super::{chat::FALLBACK_USERNAME, notifications::NotificationService, now};

/// A post as submitted from the create form.
#[derive(Debug, Clone, Default)]
pub struct NewPost {
    pub caption: String,
    pub image: Option<ImageUpload>,
}

#[derive(Clone)]
pub struct PostService {
    client: SnapshareClient,
    uploader: Arc<dyn ImageUploader>,
}

impl PostService {
    pub fn new(client: SnapshareClient, uploader: Arc<dyn ImageUploader>) -> Self {
        Self { client, uploader }
    }

    pub async fn get(&self, post_id: &str) -> Result<Option<Post>, AppError> {
        Ok(self.client.posts().get(post_id).await?)
    }

    async fn require(&self, post_id: &str) -> Result<Post, AppError> {
        self.get(post_id).await?.ok_or_else(|| AppError::NotFound {
            what: "post",
            id: post_id.to_string(),
        })
    }

    async fn author(&self, uid: &str) -> Result<UserProfile, AppError> {
        self.client.users().get(uid).await?.ok_or_else(|| AppError::NotFound {
            what: "user",
            id: uid.to_string(),
        })
    }

    /// Uploads the image, then writes the post with the returned URL and a
    /// snapshot of the author's profile.
    pub async fn create_post(&self, author_id: &str, new_post: NewPost) -> Result<Post, AppError> {
        let image = new_post
            .image
            .ok_or_else(|| AppError::invalid("Please select an image"))?;
        let author = self.author(author_id).await?;

        let image_url = self
            .uploader
            .upload(image)
            .await
            .inspect_err(|err| error!("image upload for new post by {author_id} failed: {err}"))?;

        let post = Post {
            id: generate_document_id(),
            user_id: author.id.clone(),
            image_url,
            caption: new_post.caption.trim().to_string(),
            likes: Vec::new(),
            created_at: now(),
            user: author.snapshot(),
        };
        self.client
            .posts()
            .set(&post)
            .await
            .inspect_err(|err| error!("failed to save post by {author_id}: {err}"))?;
        info!("{author_id} created post {}", post.id);
        Ok(post)
    }

    pub async fn edit_caption(&self, actor: &str, post_id: &str, caption: &str) -> Result<(), AppError> {
        let post = self.require(post_id).await?;
        if post.user_id != actor {
            return Err(AppError::forbidden("only the author can edit a post"));
        }
        self.client
            .posts()
            .update(post_id, &[FieldUpdate::set("caption", caption.trim())])
            .await?;
        Ok(())
    }

    /// Deletes the post document. Its comments are left in place.
    pub async fn delete_post(&self, actor: &str, post_id: &str) -> Result<(), AppError> {
        let post = self.require(post_id).await?;
        if post.user_id != actor {
            return Err(AppError::forbidden("only the author can delete a post"));
        }
        self.client.posts().delete(post_id).await?;
        info!("{actor} deleted post {post_id}");
        Ok(())
    }

    /// Adds or removes `actor` in the post's likes. Returns whether the post is liked afterwards.
    pub async fn toggle_like(&self, actor: &str, post_id: &str) -> Result<bool, AppError> {
        let post = self.require(post_id).await?;
        let liked = post.is_liked_by(actor);
        let update = if liked {
            FieldUpdate::array_remove("likes", actor)
        } else {
            FieldUpdate::array_union("likes", actor)
        };
        self.client.posts().update(post_id, &[update]).await?;
        Ok(!liked)
    }

    /// Writes a comment, then notifies the post's author when someone else commented.
    /// The comment carries the author's display name, or `User` when it is blank.
    pub async fn add_comment(&self, actor: &str, post_id: &str, text: &str) -> Result<Comment, AppError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(AppError::invalid("comment text is required"));
        }
        let post = self.require(post_id).await?;
        let author = self.author(actor).await?;

        let comment = Comment {
            id: generate_document_id(),
            post_id: post_id.to_string(),
            user_id: actor.to_string(),
            username: match author.display_name.trim() {
                "" => FALLBACK_USERNAME.to_string(),
                name => name.to_string(),
            },
            text: text.to_string(),
            created_at: now(),
        };
        self.client
            .comments(post_id)
            .set(&comment)
            .await
            .inspect_err(|err| error!("failed to save comment on {post_id}: {err}"))?;

        if post.user_id != actor {
            let message = format!("{} commented on your post", author.display_label());
            NotificationService::new(self.client.clone())
                .create(&post.user_id, &author, NotificationKind::Comment, message, Some(post_id))
                .await?;
        }
        Ok(comment)
    }

    pub async fn delete_comment(&self, actor: &str, post_id: &str, comment_id: &str) -> Result<(), AppError> {
        let comments = self.client.comments(post_id);
        let comment = comments.get(comment_id).await?.ok_or_else(|| AppError::NotFound {
            what: "comment",
            id: comment_id.to_string(),
        })?;
        if comment.user_id != actor {
            return Err(AppError::forbidden("only the author can delete a comment"));
        }
        comments.delete(comment_id).await?;
        Ok(())
    }

    /// Comments of a post, oldest first.
    pub async fn comments(&self, post_id: &str) -> Result<Vec<Comment>, AppError> {
        let comments = self.client.comments(post_id);
        let query = comments.query().order_by("createdAt", SortOrder::Asc);
        Ok(comments.find_many(&query).await?)
    }

    pub async fn watch_comments(&self, post_id: &str) -> Result<LiveView<Comment>, AppError> {
        let comments = self.client.comments(post_id);
        let subscription = comments
            .subscribe(comments.query().order_by("createdAt", SortOrder::Asc))
            .await?;
        Ok(LiveView::new(subscription))
    }
}
