use crate::filter::Endpoint;
use crate::request::Request;
use crate::resource::ResourceOptions;
use crate::response::{DataResponse, Outcome};

/// Wraps bare values returned by the handler into a `200 OK`
/// [`DataResponse`]. Raw responses and data responses pass through.
///
/// Nothing is serialized here, so filters further out can still validate
/// the data.
pub fn transform_response(next: Endpoint, _options: &ResourceOptions) -> Endpoint {
    Endpoint::new(move |req: Request| {
        let next = next.clone();
        async move {
            Ok(match next.call(req).await? {
                Outcome::Value(data) => Outcome::Data(DataResponse::new(data)),
                other => other,
            })
        }
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::response::Response;

    async fn run(outcome: Outcome) -> Outcome {
        let handler = Endpoint::new(move |_req: Request| {
            let outcome = outcome.clone();
            async move { Ok(outcome) }
        });
        transform_response(handler, &ResourceOptions::default())
            .call(Request::builder().build())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn bare_value_becomes_data_response() {
        match run(Outcome::Value(json!({"a": 1}))).await {
            Outcome::Data(rsp) => assert_eq!(rsp.data(), &json!({"a": 1})),
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[tokio::test]
    async fn data_response_passes_through() {
        let rsp = DataResponse::new(json!({"a": 1})).with_header("x-test", "1");
        match run(Outcome::Data(rsp.clone())).await {
            Outcome::Data(out) => assert_eq!(out, rsp),
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[tokio::test]
    async fn raw_response_passes_through() {
        match run(Outcome::Raw(Response::text("abc"))).await {
            Outcome::Raw(rsp) => assert_eq!(rsp.body().as_ref(), b"abc"),
            other => panic!("unexpected outcome {other:?}"),
        }
    }
}
