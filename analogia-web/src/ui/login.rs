use std::rc::Rc;

use analogia_client::login::{self, LoginError, LoginStep};
use yew::prelude::*;

use crate::api::HttpApi;

#[derive(Clone, PartialEq, Properties)]
pub struct LoginProps {
    pub api: Rc<HttpApi>,
    pub step: LoginStep,
    pub on_step: Callback<LoginStep>,
}

pub struct Login {
    email: String,
    username: String,
    pending: bool,
    error: Option<LoginError>,
}

pub enum LoginMsg {
    EmailChanged(String),
    UsernameChanged(String),
    SubmitClicked,
    Done(Result<LoginStep, LoginError>),
    Restart,
}

impl Component for Login {
    type Message = LoginMsg;
    type Properties = LoginProps;

    fn create(ctx: &Context<Self>) -> Self {
        let email = match &ctx.props().step {
            LoginStep::ChooseUsername { email } | LoginStep::Rejected { email } => email.clone(),
            _ => String::new(),
        };
        Self {
            email,
            username: String::new(),
            pending: false,
            error: None,
        }
    }

    fn update(&mut self, ctx: &Context<Self>, msg: Self::Message) -> bool {
        match msg {
            LoginMsg::EmailChanged(e) => self.email = e,
            LoginMsg::UsernameChanged(u) => self.username = u,
            LoginMsg::SubmitClicked => {
                if self.pending {
                    return false;
                }
                self.pending = true;
                self.error = None;
                let api = ctx.props().api.clone();
                let email = self.email.clone();
                match &ctx.props().step {
                    LoginStep::ChooseUsername { email } => {
                        let email = email.clone();
                        let username = self.username.clone();
                        ctx.link().send_future(async move {
                            LoginMsg::Done(
                                login::submit_username(&*api, &crate::IDENTITY, &email, &username)
                                    .await,
                            )
                        });
                    }
                    _ => {
                        ctx.link().send_future(async move {
                            LoginMsg::Done(login::submit_email(&*api, &crate::IDENTITY, &email).await)
                        });
                    }
                }
            }
            LoginMsg::Done(res) => {
                self.pending = false;
                match res {
                    Ok(step) => ctx.props().on_step.emit(step),
                    Err(e) => self.error = Some(e),
                }
            }
            LoginMsg::Restart => {
                self.username.clear();
                self.error = None;
                ctx.props().on_step.emit(LoginStep::EnterEmail);
            }
        }
        true
    }

    fn view(&self, ctx: &Context<Self>) -> Html {
        macro_rules! callback_for {
            ($msg:ident) => {
                ctx.link().callback(|e: web_sys::Event| {
                    let input: web_sys::HtmlInputElement = e.target_unchecked_into();
                    LoginMsg::$msg(input.value())
                })
            };
        }
        let onsubmit = ctx.link().callback(|e: SubmitEvent| {
            e.prevent_default();
            LoginMsg::SubmitClicked
        });
        let error = self
            .error
            .as_ref()
            .map(|e| html! { <div class="invalid-feedback d-block">{ e.to_string() }</div> });
        let body = match &ctx.props().step {
            LoginStep::ChooseUsername { email } => html! {<>
                <span class="input-group-text">{ email }</span>
                <input
                    type="text"
                    class="form-control"
                    placeholder="Pick a username"
                    aria-label="Username"
                    value={ self.username.clone() }
                    onchange={ callback_for!(UsernameChanged) }
                />
                <button type="submit" class="btn btn-primary" disabled={ self.pending }>
                    { "Save" }
                </button>
            </>},
            LoginStep::Rejected { email } => html! {<>
                <span class="input-group-text">
                    { format!("{email} is not allowed to comment") }
                </span>
                <button
                    type="button"
                    class="btn btn-secondary"
                    onclick={ ctx.link().callback(|_| LoginMsg::Restart) }
                >
                    { "Try another email" }
                </button>
            </>},
            LoginStep::EnterEmail | LoginStep::LoggedIn(_) => html! {<>
                <input
                    type="email"
                    class="form-control"
                    placeholder="member@example.org"
                    aria-label="Email"
                    value={ self.email.clone() }
                    onchange={ callback_for!(EmailChanged) }
                />
                <button type="submit" class="btn btn-primary" disabled={ self.pending }>
                    { "Verify" }
                </button>
            </>},
        };
        html! {
            <form class="login-form" { onsubmit }>
                <div class="input-group">{ body }</div>
                { for error }
            </form>
        }
    }
}
