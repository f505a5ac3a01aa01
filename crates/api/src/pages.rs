//! HTML confirmation pages.
//!
//! Three variants: invalid link, already verified, and the pending page that
//! sends the user to the ad or task, runs the dwell countdown and then calls
//! the matching complete endpoint once per click. The countdown is purely
//! cosmetic; the server accepts completion at any time.
//!
//! When completion requires the bot secret the page cannot confirm on its
//! own, so the pending page only links to the target and sends the user back
//! to the bot.

use adverify_core::token::{TokenKind, TokenRecord};

/// Inputs of the pending page that do not come from the record.
#[derive(Debug, Clone, Copy)]
pub struct PageContext<'a> {
    /// Where the "open ad" button points.
    pub ad_link: &'a str,
    /// Countdown length in seconds.
    pub dwell_secs: u32,
    /// Whether the page may call the complete endpoint itself.
    pub confirm_on_page: bool,
}

const STYLE: &str = "\
body{font-family:Arial,sans-serif;background:linear-gradient(135deg,#667eea 0%,#764ba2 100%);\
min-height:100vh;margin:0;display:flex;justify-content:center;align-items:center;padding:20px}\
.container{background:#fff;border-radius:20px;box-shadow:0 20px 60px rgba(0,0,0,.3);\
max-width:600px;width:100%;padding:40px;text-align:center}\
h1{color:#667eea}\
.task-info{background:#e3f2fd;border:2px solid #90caf9;border-radius:10px;padding:20px;margin:20px 0}\
.action{display:inline-block;background:#3498db;color:#fff;padding:15px 30px;text-decoration:none;\
border-radius:10px;font-size:18px;font-weight:bold;margin:20px 0}\
#timer{font-size:48px;font-weight:bold;color:#e74c3c;margin:20px 0;display:none}\
#confirmBtn{background:#95a5a6;color:#fff;border:none;padding:18px 40px;font-size:20px;\
border-radius:50px;cursor:not-allowed;opacity:.6}\
#confirmBtn.enabled{background:#27ae60;cursor:pointer;opacity:1}\
#message{margin-top:20px;padding:15px;border-radius:10px;display:none}\
.success{background:#d4edda;color:#155724}.error{background:#f8d7da;color:#721c24}";

pub fn invalid_link() -> String {
    notice_page("Invalid link", "This verification link is not valid.")
}

pub fn already_verified() -> String {
    notice_page("Already verified", "This link has already been confirmed.")
}

/// Page for a pending token of either kind.
pub fn pending(record: &TokenRecord, ctx: PageContext<'_>) -> String {
    let (title, intro, target, complete_path) = match (record.kind, &record.task) {
        (TokenKind::Task, Some(task)) => (
            "Complete the task",
            format!(
                "<div class=\"task-info\"><p><strong>{}</strong></p><p>Reward: {} points</p></div>",
                escape_html(&task.task_description),
                task.task_points
            ),
            safe_href(&task.task_url),
            "/api/complete-task",
        ),
        _ => (
            "Watch the ad",
            String::new(),
            safe_href(ctx.ad_link),
            "/api/complete-ad",
        ),
    };
    let dwell = ctx.dwell_secs;

    let (steps, on_open, confirm) = if ctx.confirm_on_page {
        (
            format!("1. Open the link<br>2. Finish the action<br>3. Wait {dwell} seconds<br>4. Press confirm"),
            " onclick=\"startTimer()\"",
            confirm_block(&record.token, dwell, complete_path),
        )
    } else {
        (
            "1. Open the link<br>2. Finish the action<br>3. Return to the bot to confirm".to_string(),
            "",
            "<p id=\"botConfirm\">Confirmation happens in the bot.</p>".to_string(),
        )
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>{title}</title>
<style>{STYLE}</style>
</head>
<body>
<div class="container">
<h1>{title}</h1>
{intro}
<p>{steps}</p>
<a href="{target}" target="_blank" rel="noopener" class="action"{on_open}>Open</a>
{confirm}
</div>
</body>
</html>"#
    )
}

/// Countdown, confirm button and the script calling `complete_path`.
fn confirm_block(token: &str, dwell: u32, complete_path: &str) -> String {
    format!(
        r#"<div id="timer">{dwell}</div>
<button id="confirmBtn" onclick="confirmAction()" disabled>Wait {dwell} seconds</button>
<div id="message"></div>
<script>
const token = {token_js};
let opened = false;
let started = false;
let countdown = {dwell};

function startTimer() {{
  if (started) return;
  opened = true;
  started = true;
  const timer = document.getElementById('timer');
  timer.style.display = 'block';
  const tick = () => {{
    if (countdown <= 0) {{
      timer.style.display = 'none';
      const btn = document.getElementById('confirmBtn');
      btn.disabled = false;
      btn.className = 'enabled';
      btn.textContent = 'Confirm';
      return;
    }}
    timer.textContent = countdown;
    countdown--;
    setTimeout(tick, 1000);
  }};
  tick();
}}

async function confirmAction() {{
  const btn = document.getElementById('confirmBtn');
  const msg = document.getElementById('message');
  if (!opened || countdown > 0) {{
    msg.className = 'error';
    msg.style.display = 'block';
    msg.textContent = 'Open the link and wait for the countdown first.';
    return;
  }}
  btn.disabled = true;
  btn.textContent = 'Checking...';
  try {{
    const res = await fetch('{complete_path}', {{
      method: 'POST',
      headers: {{ 'Content-Type': 'application/json' }},
      body: JSON.stringify({{ token }})
    }});
    const data = await res.json();
    msg.className = data.success ? 'success' : 'error';
    msg.textContent = data.success ? 'Verified! You can return to the bot.' : (data.error || 'Something went wrong');
    msg.style.display = 'block';
  }} catch (e) {{
    msg.className = 'error';
    msg.textContent = 'Connection error, please retry.';
    msg.style.display = 'block';
    btn.disabled = false;
    btn.textContent = 'Confirm';
  }}
}}
</script>"#,
        token_js = js_string(token),
    )
}

fn notice_page(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html><html lang=\"en\"><head><meta charset=\"UTF-8\"><title>{title}</title>\
         <style>{STYLE}</style></head><body><div class=\"container\"><h1>{title}</h1>\
         <p>{body}</p></div></body></html>"
    )
}

/// Escape text for HTML element and attribute context.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

/// Only http(s) links are rendered; anything else becomes `#`.
fn safe_href(url: &str) -> String {
    let trimmed = url.trim();
    let lower = trimmed.to_ascii_lowercase();
    if lower.starts_with("https://") || lower.starts_with("http://") {
        escape_html(trimmed)
    } else {
        "#".to_string()
    }
}

/// JSON string literal that is safe inside a `<script>` element.
fn js_string(value: &str) -> String {
    serde_json::Value::String(value.to_string())
        .to_string()
        .replace('<', "\\u003c")
        .replace('>', "\\u003e")
}
