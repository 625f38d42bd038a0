//! Shared stylesheet written next to the conversation documents.

use std::fs;
use std::path::Path;

use crate::error::Result;

/// File name every document links to.
pub const STYLESHEET_FILE: &str = "stylesheet.css";

/// Stylesheet content. Identical on every run.
pub const STYLESHEET: &str = r#"
.msg_date, .msg_sender_incoming, .msg_sender_outgoing {
    font-family: 'Courier New', monospace;
    font-size: 0.75em;
    white-space: nowrap;
}
.msg_date {
    color: #600000;
}
.msg_sender_incoming {
    color: #000060;
}
.msg_sender_incoming::before {
    content: " << ";
}
.msg_sender_outgoing {
    color: #006000;
}
.msg_sender_outgoing::before {
    content: " >> ";
}
.msg_body {
    white-space: pre-wrap;
}
.mms_img {
    max-height: 50vh;
    border: 0;
}
.month_convos tr, .month_convos td {
    vertical-align: text-top;
}
.one_message + hr {
    width: 20%;
    margin-left: 0;
    color: #808080;
}
.toc {
    -moz-column-width: 30em;
    -webkit-column-width: 30em;
    column-width: 30em;
}
"#;

/// Writes [`STYLESHEET`] into `output_dir`.
pub fn write_stylesheet(output_dir: &Path) -> Result<()> {
    fs::write(output_dir.join(STYLESHEET_FILE), STYLESHEET)?;
    Ok(())
}
