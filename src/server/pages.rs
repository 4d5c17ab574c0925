//! Embedded HTML pages. Rendering stays deliberately minimal; there is no
//! template engine behind the gateway.

use crate::models::AppCatalog;

pub fn login(error: Option<&str>) -> String {
    let error_line = error
        .map(|e| format!("<p class=\"error\">{}</p>", escape(e)))
        .unwrap_or_default();

    format!(
        "<!DOCTYPE html>\n<html>\n<head>\
         <title>Gateway Login</title>\
         <link rel=\"stylesheet\" href=\"/static/style.css\">\
         </head>\n<body>\n\
         <h1>Gateway Login</h1>\n{error_line}\n\
         <form method=\"post\" action=\"/login\">\n\
         <label>Username <input type=\"text\" name=\"username\"></label>\n\
         <label>Password <input type=\"password\" name=\"password\"></label>\n\
         <button type=\"submit\">Log in</button>\n\
         </form>\n</body>\n</html>"
    )
}

pub fn dashboard(user: &str, catalog: &AppCatalog) -> String {
    let mut apps: Vec<&String> = catalog.keys().collect();
    apps.sort();

    let mut catalog_html = String::new();
    for app in apps {
        let mut events = catalog[app].clone();
        events.sort();
        catalog_html.push_str(&format!(
            "<li><strong>{}</strong>: {}</li>\n",
            escape(app),
            escape(&events.join(", "))
        ));
    }
    if catalog_html.is_empty() {
        catalog_html.push_str("<li><em>Catalog unavailable</em></li>\n");
    }

    format!(
        "<!DOCTYPE html>\n<html>\n<head>\
         <title>Gateway</title>\
         <link rel=\"stylesheet\" href=\"/static/style.css\">\
         </head>\n<body>\n\
         <h1>Gateway</h1>\n\
         <p>Signed in as <strong>{user}</strong> &middot; <a href=\"/logout\">log out</a></p>\n\
         <h2>Available apps</h2>\n<ul>\n{catalog}\n</ul>\n\
         <h2>Send event</h2>\n\
         <form method=\"post\" action=\"/api/send\">\n\
         <label>App <input type=\"text\" name=\"app_name\"></label>\n\
         <label>Platform <input type=\"text\" name=\"platform\"></label>\n\
         <label>Device ID <input type=\"text\" name=\"device_id\"></label>\n\
         <label>Event <input type=\"text\" name=\"event_name\"></label>\n\
         <button type=\"submit\">Send</button>\n\
         </form>\n</body>\n</html>",
        user = escape(user),
        catalog = catalog_html,
    )
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
