use std::rc::Rc;

use analogia_client::{
    api::PostId,
    login::{self, LoginStep},
};
use yew::prelude::*;

use crate::{api::HttpApi, ui, ApiConfig};

#[derive(Clone, PartialEq, Properties)]
pub struct AppProps {
    pub config: ApiConfig,
    pub post_id: Option<PostId>,
}

pub enum AppMsg {
    LoginStep(LoginStep),
    Logout,
}

pub struct App {
    api: Rc<HttpApi>,
    login_step: LoginStep,
}

impl Component for App {
    type Message = AppMsg;
    type Properties = AppProps;

    fn create(ctx: &Context<Self>) -> Self {
        App {
            api: Rc::new(HttpApi::new(&ctx.props().config)),
            login_step: LoginStep::initial(&crate::IDENTITY),
        }
    }

    fn update(&mut self, _ctx: &Context<Self>, msg: Self::Message) -> bool {
        match msg {
            AppMsg::LoginStep(step) => {
                tracing::debug!("login step is now {step:?}");
                self.login_step = step;
            }
            AppMsg::Logout => {
                self.login_step = login::logout(&crate::IDENTITY);
            }
        }
        true
    }

    fn view(&self, ctx: &Context<Self>) -> Html {
        let identity = match &self.login_step {
            LoginStep::LoggedIn(i) => Some(i.clone()),
            _ => None,
        };
        let section = match ctx.props().post_id {
            Some(post_id) => html! {
                <ui::CommentSection
                    { post_id }
                    api={ self.api.clone() }
                    config={ ctx.props().config.comments.clone() }
                    identity={ identity.clone() }
                />
            },
            None => html! {
                <div class="alert alert-secondary">{ "No post selected." }</div>
            },
        };
        html! {
            <div class="container">
                <div class="d-flex justify-content-end my-3">
                    {
                        match identity {
                            Some(i) => html! {
                                <>
                                    <span class="me-3">{ format!("Signed in as {}", i.username) }</span>
                                    <button
                                        class="btn btn-outline-secondary btn-sm"
                                        onclick={ ctx.link().callback(|_| AppMsg::Logout) }
                                    >
                                        { "Logout" }
                                    </button>
                                </>
                            },
                            None => html! {
                                <ui::Login
                                    api={ self.api.clone() }
                                    step={ self.login_step.clone() }
                                    on_step={ ctx.link().callback(AppMsg::LoginStep) }
                                />
                            },
                        }
                    }
                </div>
                { section }
            </div>
        }
    }
}
