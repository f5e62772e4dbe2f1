// Outreach draft rendering.
//
// A draft is a templated reply for a lead. It is never sent; the caller
// shows or logs it and records that the lead was drafted.

use crate::db::models::Lead;

/// Render the outreach message for a lead. Same lead fields, same text.
pub fn render(lead: &Lead) -> String {
    format!(
        "Hello,\n\n\
         I'm excited about your project titled '{title}'. \
         With my expertise in Python and automation, I believe I can deliver top-notch \
         results tailored to your needs. I would love to discuss the project further and \
         see how we might work together.\n\n\
         Best regards,\n[Your Name]",
        title = lead.title
    )
}
