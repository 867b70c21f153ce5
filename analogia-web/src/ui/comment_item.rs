use analogia_client::{api::CommentId, CommentNode};
use yew::prelude::*;

#[derive(Clone, PartialEq, Properties)]
pub struct CommentItemProps {
    pub node: CommentNode,
    pub current_email: Option<String>,
    pub reply_target: Option<CommentId>,
    pub reply_text: String,
    pub max_reply_depth: usize,
    pub on_reply: Callback<CommentId>,
    pub on_reply_change: Callback<String>,
    pub on_submit_reply: Callback<()>,
    pub on_delete: Callback<CommentId>,
}

#[function_component(CommentItem)]
pub fn comment_item(p: &CommentItemProps) -> Html {
    let c = &p.node.comment;
    let id = c.id;
    let is_mine = p.current_email.as_deref() == Some(c.author_email.as_str());
    let replyable = p.node.depth < p.max_reply_depth;
    let reply_open = p.reply_target == Some(id);

    let reply_box = reply_open.then(|| {
        let on_submit_reply = p.on_submit_reply.clone();
        html! {
            <div class="reply-box input-group input-group-sm my-2">
                <input
                    type="text"
                    class="form-control"
                    placeholder="Write a reply"
                    value={ p.reply_text.clone() }
                    oninput={ p.on_reply_change.reform(|e: InputEvent| {
                        let input: web_sys::HtmlInputElement = e.target_unchecked_into();
                        input.value()
                    }) }
                    onkeyup={ Callback::from(move |e: KeyboardEvent| {
                        if e.key() == "Enter" {
                            on_submit_reply.emit(())
                        }
                    }) }
                />
                <button class="btn btn-primary" onclick={ p.on_submit_reply.reform(|_| ()) }>
                    { "Reply" }
                </button>
            </div>
        }
    });

    html! {
        <li class={ classes!("comment", format!("comment-depth-{}", p.node.depth)) }>
            <div class="d-flex align-items-baseline">
                <strong class="me-2">{ &c.author_name }</strong>
                <small class="text-muted flex-fill">
                    { c.created_at.format("%Y-%m-%d %H:%M").to_string() }
                </small>
                if replyable {
                    <button
                        type="button"
                        class="btn btn-link btn-sm"
                        onclick={ p.on_reply.reform(move |_| id) }
                    >
                        { if reply_open { "Cancel" } else { "Reply" } }
                    </button>
                }
                if is_mine {
                    <button
                        type="button"
                        class="btn btn-link btn-sm text-danger"
                        onclick={ p.on_delete.reform(move |_| id) }
                    >
                        { "Delete" }
                    </button>
                }
            </div>
            <p class="mb-1">{ &c.content }</p>
            { for reply_box }
            if !p.node.children.is_empty() {
                <ul class="list-unstyled ms-4">
                    { for p.node.children.iter().map(|child| html! {
                        <CommentItem
                            node={ child.clone() }
                            current_email={ p.current_email.clone() }
                            reply_target={ p.reply_target }
                            reply_text={ p.reply_text.clone() }
                            max_reply_depth={ p.max_reply_depth }
                            on_reply={ p.on_reply.clone() }
                            on_reply_change={ p.on_reply_change.clone() }
                            on_submit_reply={ p.on_submit_reply.clone() }
                            on_delete={ p.on_delete.clone() }
                        />
                    }) }
                </ul>
            }
        </li>
    }
}
