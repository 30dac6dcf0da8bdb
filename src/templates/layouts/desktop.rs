use maud::{html, Markup, DOCTYPE};

pub fn desktop_layout(title: &str, content: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (title) }
            }
            body {
                header {
                    h3 { "Car market comparison" }
                    nav {
                        ul {
                            li { a href="/" { "Summary" } }
                            li { a href="/api/top-deals" { "Top deals (JSON)" } }
                            li { a href="/export/top-deals.xlsx" { "Export (XLSX)" } }
                        }
                    }
                }
                (content)
            }
        }
    }
}
