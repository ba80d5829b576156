//! 接口说明页。
//!
//! - GET /

use axum::response::Html;

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>iRegul Proxy</title>
<style>
body { font-family: sans-serif; max-width: 48rem; margin: 2rem auto; padding: 0 1rem; }
code { background: #f2f2f2; padding: 0.1rem 0.3rem; }
</style>
</head>
<body>
<h1>iRegul Proxy</h1>
<p>Transparent TCP relay between an iRegul heat pump controller and the iRegul cloud.
Every frame sent by the heat pump is forwarded unchanged; the latest decoded frame is exposed below.</p>
<h2>Endpoints</h2>
<ul>
<li><code>GET /api/data</code> latest decoded frame (404 until the heat pump has sent one)</li>
<li><code>GET /api/health</code> proxy status and number of active sessions</li>
<li><code>GET /api/metrics</code> relay counters</li>
<li><code>GET /api/sessions</code> registered connections and their state</li>
</ul>
<h2>Heat pump setup</h2>
<p>Point the controller's cloud address at this host and the proxy port
(<code>PROXY_PORT</code>, default <code>65001</code>).</p>
</body>
</html>
"#;

pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}
