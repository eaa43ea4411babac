/// Sanitizes certificate template markup.
///
/// Whitelist-based: layout tags and their `class`/`style`/`id` attributes survive so a
/// template can be styled, while `<script>`, `<iframe>` and event handler attributes are stripped.
/// `{{token}}` placeholders are plain text and pass through untouched.
pub fn clean_template_html(input: &str) -> String {
    ammonia::Builder::default()
        .add_generic_attributes(&["class", "style", "id"])
        .clean(input)
        .to_string()
}

/// Escapes a value for insertion into HTML text or attribute context.
pub fn escape_text(input: &str) -> String {
    ammonia::clean_text(input)
}

/// Stylesheets are embedded in a `<style>` element; a closing tag inside would end it early.
pub fn neutralize_css(css: &str) -> String {
    css.replace("</", "<\\/")
}
