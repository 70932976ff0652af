use crate::{
    client::SnapshareClient,
    errors::AppError,
    live::LiveView,
    models::Post,
    store::{Query, SortOrder},
};

/// Post listings: the global home feed and per-user profile grids.
#[derive(Clone)]
pub struct FeedService {
    client: SnapshareClient,
}

fn newest_first(a: &Post, b: &Post) -> std::cmp::Ordering {
    b.created_at.cmp(&a.created_at)
}

impl FeedService {
    pub fn new(client: SnapshareClient) -> Self {
        Self { client }
    }

    fn home_query(&self) -> Query {
        self.client.posts().query().order_by("createdAt", SortOrder::Desc)
    }

    fn profile_query(&self, uid: &str) -> Query {
        self.client.posts().query().where_eq("userId", uid)
    }

    /// All posts, newest first.
    pub async fn home_feed(&self, limit: Option<usize>) -> Result<Vec<Post>, AppError> {
        let query = match limit {
            Some(limit) => self.home_query().limit(limit),
            None => self.home_query(),
        };
        Ok(self.client.posts().find_many(&query).await?)
    }

    pub async fn watch_home_feed(&self) -> Result<LiveView<Post>, AppError> {
        let subscription = self.client.posts().subscribe(self.home_query()).await?;
        Ok(LiveView::new(subscription))
    }

    /// Posts by `uid`, newest first. The query filters only; ordering is done here.
    pub async fn profile_posts(&self, uid: &str) -> Result<Vec<Post>, AppError> {
        let mut posts = self.client.posts().find_many(&self.profile_query(uid)).await?;
        posts.sort_by(newest_first);
        Ok(posts)
    }

    pub async fn watch_profile_posts(&self, uid: &str) -> Result<LiveView<Post>, AppError> {
        let subscription = self.client.posts().subscribe(self.profile_query(uid)).await?;
        Ok(LiveView::new(subscription).sorted_by(newest_first))
    }
}
