#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    /// Number of comments requested per page
    pub page_size: u32,

    /// Comments at this depth (top-level comments being at depth 1) do not offer a
    /// reply box anymore. This is a display rule, the store accepts deeper threads.
    pub max_reply_depth: usize,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            page_size: 10,
            max_reply_depth: 3,
        }
    }
}

impl Config {
    pub fn sanitized(self) -> Config {
        Config {
            page_size: self.page_size.max(1),
            max_reply_depth: self.max_reply_depth.max(1),
        }
    }
}
