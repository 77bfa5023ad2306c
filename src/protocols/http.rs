use color_eyre::Result;
use hyper::{Request, Uri};
use serde::{Deserialize, Serialize};

pub type HyperHttpClient = hyper::Client<hyper::client::HttpConnector>;

pub fn mk_hyper_http_client() -> HyperHttpClient {
    let mut http = hyper::client::HttpConnector::new();
    http.set_nodelay(true);

    hyper::Client::builder().build(http)
}

pub async fn mk_post_request<RequestBody, ResponseBody>(
    client: &HyperHttpClient,
    uri: &Uri,
    body: &RequestBody,
) -> Result<ResponseBody>
where
    RequestBody: Serialize,
    ResponseBody: for<'a> Deserialize<'a>,
{
    let body = serde_json::to_string(body)?;

    let request = Request::builder()
        .method("POST")
        .header("content-type", "application/json")
        .uri(uri)
        .body(body.into())?;

    let result = client.request(request).await?;
    let body_bytes = hyper::body::to_bytes(result.into_body()).await?;
    let de = &mut serde_json::Deserializer::from_slice(&body_bytes);
    let response: ResponseBody = serde_path_to_error::deserialize(de)?;

    Ok(response)
}
