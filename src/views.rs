//! Server-side HTML rendering.
//!
//! Pages are assembled from a shared layout with identity-aware navigation
//! and an optional flash banner. User-entered text is escaped before it is
//! interpolated; the post body is administrator-authored rich text and is
//! rendered as-is.

use axum::response::Html;

use crate::models::{BlogPost, Comment, LoginForm, PostForm, RegisterForm, User};

/// Replace the five characters with HTML significance in user-entered text.
pub fn escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Stable avatar URL derived from the commenter's email address.
/// The image is generated by an external service; no request leaves this
/// server.
pub fn avatar_url(email: &str) -> String {
    format!(
        "https://api.dicebear.com/7.x/avataaars/svg?seed={}",
        escape(email)
    )
}

fn nav(user: Option<&User>) -> String {
    let mut links = String::from(r#"<a href="/">Home</a> <a href="/about">About</a> <a href="/contact">Contact</a>"#);
    match user {
        Some(u) if u.is_admin() => {
            links.push_str(r#" <a href="/new-post">New Post</a> <a href="/logout">Log Out</a>"#);
        }
        Some(_) => {
            links.push_str(r#" <a href="/logout">Log Out</a>"#);
        }
        None => {
            links.push_str(r#" <a href="/login">Login</a> <a href="/register">Register</a>"#);
        }
    }
    format!("<nav>{links}</nav>")
}

fn flash_banner(flash: Option<&str>) -> String {
    match flash {
        Some(message) => format!(r#"<p class="flash">{}</p>"#, escape(message)),
        None => String::new(),
    }
}

fn error_list(errors: &[String]) -> String {
    if errors.is_empty() {
        return String::new();
    }
    let items: String = errors
        .iter()
        .map(|e| format!("<li>{}</li>", escape(e)))
        .collect();
    format!(r#"<ul class="form-errors">{items}</ul>"#)
}

/// Shared page chrome: title, navigation, flash banner, body.
fn layout(title: &str, user: Option<&User>, flash: Option<&str>, body: &str) -> Html<String> {
    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{title}</title>
</head>
<body>
<header>{nav}</header>
{flash}
<main>
{body}
</main>
<footer><p>The Blog</p></footer>
</body>
</html>"#,
        title = escape(title),
        nav = nav(user),
        flash = flash_banner(flash),
        body = body,
    ))
}

/// GET / — every post, newest storage order, with author bylines.
pub fn index_page(posts: &[BlogPost], user: Option<&User>, flash: Option<&str>) -> Html<String> {
    let mut items = String::new();
    for post in posts {
        items.push_str(&format!(
            r#"<article>
<h2><a href="/post/{id}">{title}</a></h2>
<h3>{subtitle}</h3>
<p>Posted by {author} on {date}</p>
</article>
"#,
            id = post.id,
            title = escape(&post.title),
            subtitle = escape(&post.subtitle),
            author = escape(post.author_name.as_deref().unwrap_or("unknown")),
            date = escape(&post.date),
        ));
    }
    if posts.is_empty() {
        items.push_str("<p>No posts yet.</p>");
    }
    layout("The Blog", user, flash, &items)
}

/// GET/POST /post/{id} — full post, its comments, and the comment box.
pub fn post_page(
    post: &BlogPost,
    comments: &[Comment],
    user: Option<&User>,
    flash: Option<&str>,
    errors: &[String],
) -> Html<String> {
    let mut comment_items = String::new();
    for comment in comments {
        comment_items.push_str(&format!(
            r#"<li>
<img src="{avatar}" alt="" width="50" height="50">
<p>{text}</p>
<p class="byline">{author}</p>
</li>
"#,
            avatar = avatar_url(comment.author_email.as_deref().unwrap_or("")),
            text = escape(&comment.text),
            author = escape(comment.author_name.as_deref().unwrap_or("unknown")),
        ));
    }

    // The comment box always renders empty. Text typed before a failed
    // submission is not re-populated.
    let comment_form = format!(
        r#"<section>
<h3>Comments</h3>
<ul>{comment_items}</ul>
{errors}
<form method="post" action="/post/{id}">
<textarea name="text" rows="4"></textarea>
<button type="submit">Submit Comment</button>
</form>
</section>"#,
        comment_items = comment_items,
        errors = error_list(errors),
        id = post.id,
    );

    let body = format!(
        r#"<article>
<img src="{img}" alt="">
<h1>{title}</h1>
<h2>{subtitle}</h2>
<p>Posted by {author} on {date}</p>
<div class="post-body">{body}</div>
</article>
{comment_form}"#,
        img = escape(&post.img_url),
        title = escape(&post.title),
        subtitle = escape(&post.subtitle),
        author = escape(post.author_name.as_deref().unwrap_or("unknown")),
        date = escape(&post.date),
        body = post.body,
        comment_form = comment_form,
    );

    layout(&post.title, user, flash, &body)
}

/// GET/POST /register.
pub fn register_page(
    user: Option<&User>,
    flash: Option<&str>,
    form: &RegisterForm,
    errors: &[String],
) -> Html<String> {
    let body = format!(
        r#"<h1>Register</h1>
{errors}
<form method="post" action="/register">
<label>Name <input type="text" name="name" value="{name}"></label>
<label>Email <input type="email" name="email" value="{email}"></label>
<label>Password <input type="password" name="password"></label>
<button type="submit">Sign Me Up</button>
</form>"#,
        errors = error_list(errors),
        name = escape(&form.name),
        email = escape(&form.email),
    );
    layout("Register", user, flash, &body)
}

/// GET/POST /login.
pub fn login_page(
    user: Option<&User>,
    flash: Option<&str>,
    form: &LoginForm,
    errors: &[String],
) -> Html<String> {
    let body = format!(
        r#"<h1>Log In</h1>
{errors}
<form method="post" action="/login">
<label>Email <input type="email" name="email" value="{email}"></label>
<label>Password <input type="password" name="password"></label>
<button type="submit">Let Me In</button>
</form>"#,
        errors = error_list(errors),
        email = escape(&form.email),
    );
    layout("Log In", user, flash, &body)
}

/// GET/POST /new-post and /edit-post/{id}. The same form serves both; the
/// edit variant pre-fills current values and posts back to the edit route.
pub fn post_form_page(
    user: Option<&User>,
    is_edit: bool,
    post_id: Option<i64>,
    form: &PostForm,
    errors: &[String],
) -> Html<String> {
    let (title, action) = if is_edit {
        (
            "Edit Post",
            format!("/edit-post/{}", post_id.unwrap_or_default()),
        )
    } else {
        ("New Post", "/new-post".to_string())
    };
    let body = format!(
        r#"<h1>{title}</h1>
{errors}
<form method="post" action="{action}">
<label>Title <input type="text" name="title" value="{form_title}"></label>
<label>Subtitle <input type="text" name="subtitle" value="{subtitle}"></label>
<label>Image URL <input type="text" name="img_url" value="{img_url}"></label>
<label>Body <textarea name="body" rows="12">{post_body}</textarea></label>
<button type="submit">Submit Post</button>
</form>"#,
        title = title,
        errors = error_list(errors),
        action = action,
        form_title = escape(&form.title),
        subtitle = escape(&form.subtitle),
        img_url = escape(&form.img_url),
        post_body = escape(&form.body),
    );
    layout(title, user, None, &body)
}

/// GET /about.
pub fn about_page(user: Option<&User>) -> Html<String> {
    layout(
        "About Us",
        user,
        None,
        "<h1>About Us</h1>\n<p>This is a small blog about whatever crosses our minds.</p>",
    )
}

/// GET /contact.
pub fn contact_page(user: Option<&User>) -> Html<String> {
    layout(
        "Contact Me",
        user,
        None,
        "<h1>Contact Me</h1>\n<p>Questions and feedback are always welcome.</p>",
    )
}
