//! Authorized request pipeline with a bounded, single-shot 401 recovery path.

pub use reqwest::Method;

// crates.io
use serde::de::DeserializeOwned;
use serde_json::Value;
// self
use crate::{
	_prelude::*,
	http,
	nav::Route,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	session::Session,
};

/// Issues bearer-authenticated calls against the Bibliodex API.
///
/// Every call attaches the stored access token. The first 401 triggers exactly one shared
/// refresh and one reissue of the original request; a second 401 (or a failed refresh) is
/// terminal: the session is invalidated, the application is sent to the login view, and the
/// error still reaches the caller. Non-auth failures propagate untouched — retry policy for
/// those belongs to the individual view.
///
/// `/auth/*` endpoints must not go through this client: login has no prior token and a 401
/// there means "bad credentials", not "expired session". Use [`Session::login`] instead.
#[derive(Clone, Debug)]
pub struct ApiClient {
	session: Session,
}
impl Session {
	/// Returns a request client bound to this session.
	pub fn client(&self) -> ApiClient {
		ApiClient { session: self.clone() }
	}
}
impl ApiClient {
	/// Performs an authorized call and returns the decoded JSON body.
	///
	/// Empty 2xx bodies (e.g. a 204 from a delete) decode to [`Value::Null`].
	pub async fn request(
		&self,
		method: Method,
		path: &str,
		body: Option<&Value>,
	) -> Result<Value> {
		const KIND: FlowKind = FlowKind::Request;

		let span = FlowSpan::new(KIND, "request");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span.instrument(self.dispatch(method, path, body)).await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}

	/// Performs a GET and deserializes the response body.
	pub async fn get<T>(&self, path: &str) -> Result<T>
	where
		T: DeserializeOwned,
	{
		deserialize_value(self.request(Method::GET, path, None).await?)
	}

	/// Performs a POST with a JSON body and deserializes the response body.
	pub async fn post<T, B>(&self, path: &str, body: &B) -> Result<T>
	where
		T: DeserializeOwned,
		B: Serialize,
	{
		let body = to_value(body)?;

		deserialize_value(self.request(Method::POST, path, Some(&body)).await?)
	}

	/// Performs a PUT with a JSON body and deserializes the response body.
	pub async fn put<T, B>(&self, path: &str, body: &B) -> Result<T>
	where
		T: DeserializeOwned,
		B: Serialize,
	{
		let body = to_value(body)?;

		deserialize_value(self.request(Method::PUT, path, Some(&body)).await?)
	}

	/// Performs a DELETE, discarding any response body.
	pub async fn delete(&self, path: &str) -> Result<()> {
		self.request(Method::DELETE, path, None).await?;

		Ok(())
	}

	async fn dispatch(&self, method: Method, path: &str, body: Option<&Value>) -> Result<Value> {
		let url = self.session.config().endpoint(path)?;
		let first = self.issue(method.clone(), url.clone(), body).await?;

		if first.status != 401 {
			return complete(first);
		}

		let original = Error::Api {
			status: 401,
			detail: http::extract_detail(&first.bytes, "authentication required"),
		};

		// One shared refresh, then one reissue. The refresh routine collapses this attempt
		// with any concurrent 401s or a firing scheduler.
		if self.session.refresh().await.is_err() {
			return self.terminal(original).await;
		}

		let retried = self.issue(method, url, body).await?;

		if retried.status == 401 {
			// No second refresh: a 401 on the retried call ends the session.
			let err = Error::Api {
				status: 401,
				detail: http::extract_detail(&retried.bytes, "authentication required"),
			};

			return self.terminal(err).await;
		}

		complete(retried)
	}

	async fn issue(&self, method: Method, url: Url, body: Option<&Value>) -> Result<RawResponse> {
		let mut request = self.session.http_client().request(method, url);

		// An unreadable store sends the request unauthenticated; the server's 401 then drives
		// the normal recovery path.
		if let Ok(Some(pair)) = self.session.store().load().await {
			request = request.bearer_auth(pair.access_token.expose());
		}
		if let Some(body) = body {
			request = request.json(body);
		}

		let response = request.send().await?;
		let status = response.status().as_u16();
		let bytes = response.bytes().await?.to_vec();

		Ok(RawResponse { status, bytes })
	}

	async fn terminal(&self, error: Error) -> Result<Value> {
		self.session.invalidate().await;

		let navigator = self.session.navigator();

		if !navigator.is_at(Route::Login) {
			navigator.navigate(Route::Login);
		}

		Err(error)
	}
}

struct RawResponse {
	status: u16,
	bytes: Vec<u8>,
}

fn complete(response: RawResponse) -> Result<Value> {
	if !(200..300).contains(&response.status) {
		return Err(Error::Api {
			status: response.status,
			detail: http::extract_detail(&response.bytes, "request failed"),
		});
	}
	if response.bytes.is_empty() {
		return Ok(Value::Null);
	}

	let mut deserializer = serde_json::Deserializer::from_slice(&response.bytes);

	serde_path_to_error::deserialize(&mut deserializer)
		.map_err(|source| Error::ResponseParse { source, status: Some(response.status) })
}

fn to_value<B>(body: &B) -> Result<Value>
where
	B: Serialize,
{
	serde_json::to_value(body).map_err(|source| Error::RequestSerialize { source })
}

fn deserialize_value<T>(value: Value) -> Result<T>
where
	T: DeserializeOwned,
{
	serde_path_to_error::deserialize(value)
		.map_err(|source| Error::ResponseParse { source, status: None })
}
