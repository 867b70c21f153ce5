use crate::{Comment, PostId};

#[derive(Clone, Copy, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SortField {
    CreatedAt,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRequest {
    pub post_id: PostId,
    /// 0-based
    pub page: u32,
    pub page_size: u32,
    pub sort: SortField,
    pub direction: Direction,
}

impl PageRequest {
    /// Newest-first page, the only order comment threads are displayed in
    pub fn newest_first(post_id: PostId, page: u32, page_size: u32) -> PageRequest {
        PageRequest {
            post_id,
            page,
            page_size,
            sort: SortField::CreatedAt,
            direction: Direction::Desc,
        }
    }

    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let sort = match self.sort {
            SortField::CreatedAt => "createdAt",
        };
        let direction = match self.direction {
            Direction::Asc => "asc",
            Direction::Desc => "desc",
        };
        vec![
            ("postId", self.post_id.to_string()),
            ("page", self.page.to_string()),
            ("size", self.page_size.to_string()),
            ("sort", format!("{sort},{direction}")),
        ]
    }
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentPage {
    pub comments: Vec<Comment>,
    pub has_more: bool,
}

impl CommentPage {
    /// For backends that only report how many comments exist in total
    pub fn from_totals(comments: Vec<Comment>, page: u32, page_size: u32, total: u64) -> CommentPage {
        let fetched_so_far = (u64::from(page) + 1) * u64::from(page_size);
        CommentPage {
            comments,
            has_more: fetched_so_far < total,
        }
    }
}
