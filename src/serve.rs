//! HTTP server for interactive mode
//!
//! `rssiview serve ./results` → renders once, opens the browser, then answers
//! legend toggles against the server-side figures so every view agrees on
//! what is shown.
//!
//! Requests are handled one at a time on the calling thread.

use crate::render::overlay::Legend;
use crate::render::Figure;
use crate::report::html::{self, Mode};
use crate::trial::Trial;
use serde::{Deserialize, Serialize};
use tiny_http::{Header, Method, Request, Response, Server};
use tracing::{debug, info, warn};

#[derive(Serialize)]
struct ApiResponse<T> {
    ok: bool,
    data: Option<T>,
    error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    fn success(data: T) -> Self {
        Self { ok: true, data: Some(data), error: None }
    }
}

impl ApiResponse<()> {
    fn failure(error: String) -> Self {
        Self { ok: false, data: None, error: Some(error) }
    }
}

#[derive(Deserialize, Debug, PartialEq)]
pub struct ToggleParams {
    pub figure: usize,
    pub label: String,
}

#[derive(Deserialize, Debug, PartialEq)]
pub struct LegendParams {
    #[serde(default)]
    pub figure: usize,
}

#[derive(Serialize, Debug, PartialEq)]
pub struct ToggleResult {
    pub figure: usize,
    pub label: String,
    pub visible: bool,
}

/// What the server holds between requests.
#[derive(Debug)]
pub struct ServeState {
    pub figures: Vec<Figure>,
    pub trials: Vec<Trial>,
}

impl ServeState {
    pub fn new(figures: Vec<Figure>, trials: Vec<Trial>) -> Self {
        Self { figures, trials }
    }

    pub fn toggle(&mut self, params: &ToggleParams) -> Result<ToggleResult, String> {
        let figure = self
            .figures
            .get_mut(params.figure)
            .ok_or_else(|| format!("no figure {}", params.figure))?;
        let visible = figure
            .toggle(&params.label)
            .ok_or_else(|| format!("label '{}' is not on figure {}", params.label, params.figure))?;
        Ok(ToggleResult {
            figure: params.figure,
            label: params.label.clone(),
            visible,
        })
    }

    pub fn legend(&self, figure: usize) -> Option<&Legend> {
        self.figures.get(figure).map(Figure::legend)
    }
}

/// A response before it is handed to tiny_http.
#[derive(Debug, PartialEq)]
pub struct Reply {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
}

impl Reply {
    fn json<T: Serialize>(status: u16, value: &T) -> Self {
        let body = serde_json::to_string(value)
            .unwrap_or_else(|e| format!(r#"{{"ok":false,"data":null,"error":"{}"}}"#, e));
        Self { status, content_type: "application/json", body }
    }

    fn not_found(error: String) -> Self {
        Self::json(404, &ApiResponse::failure(error))
    }
}

fn query_of(url: &str) -> &str {
    url.split_once('?').map_or("", |(_, q)| q)
}

/// Query string first, then a JSON body.
fn parse_params<T: serde::de::DeserializeOwned>(url: &str, body: &str) -> Result<T, String> {
    match serde_urlencoded::from_str::<T>(query_of(url)) {
        Ok(params) => Ok(params),
        Err(query_err) if !body.trim().is_empty() => {
            serde_json::from_str(body).map_err(|e| format!("bad parameters: {}; {}", query_err, e))
        }
        Err(e) => Err(format!("bad parameters: {}", e)),
    }
}

/// Route one request against the current state.
pub fn route(state: &mut ServeState, method: &Method, url: &str, body: &str) -> Reply {
    let path = url.split('?').next().unwrap_or("/");

    match (method, path) {
        (&Method::Get, "/") => {
            let mut page = Vec::new();
            match html::write_page(&mut page, &state.figures, &state.trials, Mode::Served) {
                Ok(()) => Reply {
                    status: 200,
                    content_type: "text/html; charset=utf-8",
                    body: String::from_utf8_lossy(&page).into_owned(),
                },
                Err(e) => Reply::json(500, &ApiResponse::failure(e.to_string())),
            }
        }

        (&Method::Get, "/api/figures") => Reply::json(200, &ApiResponse::success(&state.figures)),

        (&Method::Get, "/api/toggle") | (&Method::Post, "/api/toggle") => {
            let params = match parse_params::<ToggleParams>(url, body) {
                Ok(p) => p,
                Err(e) => return Reply::json(400, &ApiResponse::failure(e)),
            };
            match state.toggle(&params) {
                Ok(result) => {
                    debug!("'{}' on figure {} -> visible={}", result.label, result.figure, result.visible);
                    Reply::json(200, &ApiResponse::success(result))
                }
                Err(e) => Reply::not_found(e),
            }
        }

        (&Method::Get, "/api/legend") => {
            let params = match parse_params::<LegendParams>(url, body) {
                Ok(p) => p,
                Err(e) => return Reply::json(400, &ApiResponse::failure(e)),
            };
            match state.legend(params.figure) {
                Some(legend) => Reply::json(200, &ApiResponse::success(legend)),
                None => Reply::not_found(format!("no figure {}", params.figure)),
            }
        }

        _ => Reply {
            status: 404,
            content_type: "text/plain",
            body: "Not found".to_string(),
        },
    }
}

/// Start server, open browser, serve figures until the process is stopped
pub fn start(port: u16, state: ServeState, open_browser: bool) -> std::io::Result<()> {
    let addr = format!("127.0.0.1:{}", port);
    let server = Server::http(&addr).map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;

    let url = format!("http://localhost:{}", port);
    info!(
        "Serving {} figure(s) from {} trial(s) at {}",
        state.figures.len(),
        state.trials.len(),
        url
    );

    if open_browser {
        if let Err(e) = open::that(&url) {
            warn!("Could not open browser: {}", e);
        }
    }

    let mut state = state;
    for request in server.incoming_requests() {
        if let Err(e) = handle_request(request, &mut state) {
            warn!("Request failed: {}", e);
        }
    }

    Ok(())
}

fn handle_request(mut request: Request, state: &mut ServeState) -> std::io::Result<()> {
    let url = request.url().to_string();
    let method = request.method().clone();
    let mut body = String::new();
    if method == Method::Post {
        request.as_reader().read_to_string(&mut body)?;
    }

    let reply = route(state, &method, &url, &body);
    debug!("{} {} -> {}", method, url, reply.status);

    let mut response = Response::from_string(reply.body).with_status_code(reply.status);
    if let Ok(header) = Header::from_bytes(&b"Content-Type"[..], reply.content_type.as_bytes()) {
        response = response.with_header(header);
    }
    request.respond(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::classify;
    use crate::config::Config;
    use crate::render::{render_pages, MEASURED};
    use crate::trial::{AlgorithmResult, LinePoint, Sample, TrialRecord};
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    const KALMAN: &str = "Kalman(Q=4.0,R=16.0)";

    fn state() -> ServeState {
        let mut algorithms = BTreeMap::new();
        algorithms.insert(
            KALMAN.to_string(),
            AlgorithmResult {
                line: vec![LinePoint { t: Some(0), v: Some(-85.0) }],
                states: BTreeMap::new(),
            },
        );
        let record = TrialRecord {
            path: PathBuf::from("result_x.json"),
            name: "calibration_data_1761170896.csv".into(),
            base_ts: None,
            series: (0..100).map(|i| Sample { t: i * 50, rssi: Some(-85.0) }).collect(),
            algorithms,
        };
        let config = Config::default();
        let class = classify(&record, &config.classify);
        let trials = vec![Trial { record, class }];
        ServeState::new(render_pages(&trials, &config), trials)
    }

    fn json(reply: &Reply) -> serde_json::Value {
        serde_json::from_str(&reply.body).unwrap()
    }

    // ==========================================================================
    // ROUTING
    // ==========================================================================

    #[test]
    fn test_index_is_served_page() {
        let mut s = state();
        let reply = route(&mut s, &Method::Get, "/", "");
        assert_eq!(reply.status, 200);
        assert!(reply.content_type.starts_with("text/html"));
        assert!(reply.body.contains("const SERVED = true;"));
    }

    #[test]
    fn test_unknown_path_is_404() {
        let mut s = state();
        assert_eq!(route(&mut s, &Method::Get, "/nope", "").status, 404);
        assert_eq!(route(&mut s, &Method::Delete, "/api/toggle", "").status, 404);
    }

    #[test]
    fn test_figures_endpoint() {
        let mut s = state();
        let v = json(&route(&mut s, &Method::Get, "/api/figures", ""));
        assert_eq!(v["ok"], true);
        assert_eq!(v["data"].as_array().unwrap().len(), 1);
    }

    // ==========================================================================
    // TOGGLING
    // ==========================================================================

    #[test]
    fn test_toggle_via_query() {
        let mut s = state();
        let url = "/api/toggle?figure=0&label=Kalman%28Q%3D4.0%2CR%3D16.0%29";
        let v = json(&route(&mut s, &Method::Post, url, ""));
        assert_eq!(v["data"]["visible"], true);
        assert_eq!(v["data"]["label"], KALMAN);

        let v = json(&route(&mut s, &Method::Get, url, ""));
        assert_eq!(v["data"]["visible"], false);
    }

    #[test]
    fn test_toggle_via_json_body() {
        let mut s = state();
        let body = r#"{"figure": 0, "label": "Measured"}"#;
        let v = json(&route(&mut s, &Method::Post, "/api/toggle", body));
        assert_eq!(v["data"]["visible"], false);
        assert_eq!(s.legend(0).unwrap().entry(MEASURED).unwrap().visible, false);
    }

    #[test]
    fn test_toggle_unknown_label_or_figure() {
        let mut s = state();
        let reply = route(&mut s, &Method::Post, "/api/toggle?figure=0&label=Ghost", "");
        assert_eq!(reply.status, 404);
        assert_eq!(json(&reply)["ok"], false);

        let reply = route(&mut s, &Method::Post, "/api/toggle?figure=7&label=Measured", "");
        assert_eq!(reply.status, 404);

        let reply = route(&mut s, &Method::Post, "/api/toggle?label=Measured", "");
        assert_eq!(reply.status, 400);
    }

    #[test]
    fn test_legend_reflects_toggles() {
        let mut s = state();
        let v = json(&route(&mut s, &Method::Get, "/api/legend?figure=0", ""));
        assert_eq!(v["data"]["entries"][1]["visible"], false);

        s.toggle(&ToggleParams { figure: 0, label: KALMAN.into() }).unwrap();
        let v = json(&route(&mut s, &Method::Get, "/api/legend", ""));
        assert_eq!(v["data"]["entries"][1]["label"], KALMAN);
        assert_eq!(v["data"]["entries"][1]["visible"], true);

        assert_eq!(route(&mut s, &Method::Get, "/api/legend?figure=3", "").status, 404);
    }
}
