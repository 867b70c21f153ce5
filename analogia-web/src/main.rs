use analogia_client::{api::PostId, Config, IdentitySession};
use anyhow::Context;
use gloo_storage::{LocalStorage, Storage};

mod api;
mod storage;
mod ui;

const KEY_CONFIG: &str = "config";

lazy_static::lazy_static! {
    static ref CLIENT: reqwest::Client = reqwest::Client::new();

    /// Verified identity of the visitor, shared by every comment section and
    /// support button of the page
    static ref IDENTITY: IdentitySession =
        IdentitySession::load_from(storage::LocalIdentityStorage);
}

#[derive(Clone, Debug, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiConfig {
    /// Base url of the backend, without trailing slash
    pub host: String,

    #[serde(default)]
    pub comments: Config,
}

fn page_origin() -> anyhow::Result<String> {
    web_sys::window()
        .context("no window object")?
        .location()
        .origin()
        .map_err(|e| anyhow::anyhow!("reading page origin: {e:?}"))
}

fn load_config() -> anyhow::Result<ApiConfig> {
    match LocalStorage::get::<ApiConfig>(KEY_CONFIG) {
        Ok(c) => Ok(c),
        Err(e) => {
            tracing::debug!("no usable stored config ({e}), using defaults");
            Ok(ApiConfig {
                host: page_origin()?,
                comments: Config::default(),
            })
        }
    }
}

/// The post whose comments are displayed, from the `post` query parameter
fn current_post() -> Option<PostId> {
    let search = web_sys::window()?.location().search().ok()?;
    search
        .trim_start_matches('?')
        .split('&')
        .filter_map(|kv| kv.split_once('='))
        .find(|(k, _)| *k == "post")
        .and_then(|(_, v)| v.parse().ok())
        .map(PostId)
}

fn main() {
    tracing_wasm::set_as_global_default();
    let config = match load_config() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("failed loading configuration: {e:?}");
            return;
        }
    };
    yew::Renderer::<ui::App>::with_props(ui::AppProps {
        config,
        post_id: current_post(),
    })
    .render();
}
