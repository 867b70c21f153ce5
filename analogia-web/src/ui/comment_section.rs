use std::{future::Future, rc::Rc};

use analogia_client::{
    api::{CommentId, Identity, PostId, MAX_COMMENT_LEN},
    CommentController, Config, ControllerError,
};
use yew::prelude::*;

use crate::{api::HttpApi, ui};

#[derive(Clone, PartialEq, Properties)]
pub struct CommentSectionProps {
    pub post_id: PostId,
    pub api: Rc<HttpApi>,
    pub config: Config,

    /// Only used to re-render when the visitor logs in or out, the controller
    /// reads the shared session itself
    pub identity: Option<Identity>,
}

pub enum CommentSectionMsg {
    Refresh,
    ComposeChanged(String),
    SubmitCompose,
    ReplyTo(CommentId),
    ReplyChanged(String),
    SubmitReply,
    Delete(CommentId),
    LoadMore,
    DismissError,
}

pub struct CommentSection {
    controller: Rc<CommentController<HttpApi>>,
}

impl CommentSection {
    fn new_controller(props: &CommentSectionProps) -> Rc<CommentController<HttpApi>> {
        Rc::new(CommentController::new(
            props.post_id,
            props.api.clone(),
            crate::IDENTITY.clone(),
            props.config.clone(),
        ))
    }

    /// Run a controller operation, then re-render. Failures are already recorded in
    /// the controller's state for display.
    fn run<F, Fut, T>(&self, ctx: &Context<Self>, op: F)
    where
        F: 'static + FnOnce(Rc<CommentController<HttpApi>>) -> Fut,
        Fut: 'static + Future<Output = Result<T, ControllerError>>,
    {
        let controller = self.controller.clone();
        ctx.link().send_future(async move {
            if let Err(e) = op(controller).await {
                tracing::debug!("comment action failed: {e}");
            }
            CommentSectionMsg::Refresh
        });
    }
}

impl Component for CommentSection {
    type Message = CommentSectionMsg;
    type Properties = CommentSectionProps;

    fn create(ctx: &Context<Self>) -> Self {
        let this = CommentSection {
            controller: Self::new_controller(ctx.props()),
        };
        this.run(ctx, |c| async move { c.load_more().await });
        this
    }

    fn changed(&mut self, ctx: &Context<Self>, old_props: &Self::Properties) -> bool {
        let props = ctx.props();
        if props.post_id != self.controller.post_id()
            || props.api != old_props.api
            || props.config != old_props.config
        {
            self.controller.detach();
            self.controller = Self::new_controller(props);
            self.run(ctx, |c| async move { c.load_more().await });
        }
        true
    }

    fn update(&mut self, ctx: &Context<Self>, msg: Self::Message) -> bool {
        match msg {
            CommentSectionMsg::Refresh => (),
            CommentSectionMsg::ComposeChanged(t) => self.controller.set_compose_text(&t),
            CommentSectionMsg::SubmitCompose => {
                self.run(ctx, |c| async move { c.submit_compose().await })
            }
            CommentSectionMsg::ReplyTo(id) => {
                // the error, if any, is part of the next view
                let _ = self.controller.set_reply_target(Some(id));
            }
            CommentSectionMsg::ReplyChanged(t) => self.controller.set_reply_text(&t),
            CommentSectionMsg::SubmitReply => {
                self.run(ctx, |c| async move { c.submit_reply().await })
            }
            CommentSectionMsg::Delete(id) => {
                self.run(ctx, move |c| async move { c.delete_comment(id).await })
            }
            CommentSectionMsg::LoadMore => self.run(ctx, |c| async move { c.load_more().await }),
            CommentSectionMsg::DismissError => self.controller.clear_error(),
        }
        true
    }

    fn destroy(&mut self, _ctx: &Context<Self>) {
        self.controller.detach();
    }

    fn view(&self, ctx: &Context<Self>) -> Html {
        let view = self.controller.view();
        let current_email = view.identity.as_ref().map(|i| i.email.clone());

        let error = view.error.as_ref().map(|e| {
            html! {
                <div class="alert alert-warning d-flex align-items-center" role="alert">
                    <div class="flex-fill">{ e }</div>
                    <button
                        type="button"
                        class="btn-close"
                        aria-label="Dismiss"
                        onclick={ ctx.link().callback(|_| CommentSectionMsg::DismissError) }
                    ></button>
                </div>
            }
        });

        let on_reply = ctx.link().callback(CommentSectionMsg::ReplyTo);
        let on_reply_change = ctx.link().callback(CommentSectionMsg::ReplyChanged);
        let on_submit_reply = ctx.link().callback(|_| CommentSectionMsg::SubmitReply);
        let on_delete = ctx.link().callback(CommentSectionMsg::Delete);

        html! {
            <section class="comments">
                <h2>{ format!("Comments ({})", view.forest.len()) }</h2>
                { for error }
                <div class="mb-3">
                    <textarea
                        class="form-control"
                        rows="3"
                        maxlength={ MAX_COMMENT_LEN.to_string() }
                        placeholder="Write a comment"
                        value={ view.compose.clone() }
                        oninput={ ctx.link().callback(|e: InputEvent| {
                            let input: web_sys::HtmlTextAreaElement = e.target_unchecked_into();
                            CommentSectionMsg::ComposeChanged(input.value())
                        }) }
                    />
                    <div class="d-flex justify-content-between mt-1">
                        <small class="text-muted">
                            { format!("{}/{}", view.compose.chars().count(), MAX_COMMENT_LEN) }
                        </small>
                        <button
                            class="btn btn-primary btn-sm"
                            onclick={ ctx.link().callback(|_| CommentSectionMsg::SubmitCompose) }
                        >
                            { "Post" }
                        </button>
                    </div>
                </div>
                <ul class="list-unstyled">
                    { for view.forest.roots().iter().map(|node| html! {
                        <ui::CommentItem
                            node={ node.clone() }
                            current_email={ current_email.clone() }
                            reply_target={ view.reply_target }
                            reply_text={ view.reply_text.clone() }
                            max_reply_depth={ view.max_reply_depth }
                            on_reply={ on_reply.clone() }
                            on_reply_change={ on_reply_change.clone() }
                            on_submit_reply={ on_submit_reply.clone() }
                            on_delete={ on_delete.clone() }
                        />
                    }) }
                </ul>
                if view.loading {
                    <div class="spinner-border spinner-border-sm" role="status"></div>
                } else if view.has_more {
                    <button
                        class="btn btn-link"
                        onclick={ ctx.link().callback(|_| CommentSectionMsg::LoadMore) }
                    >
                        { "Load more comments" }
                    </button>
                }
            </section>
        }
    }
}
