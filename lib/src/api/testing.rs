use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::Result;

use super::{ApiResponse, Query, Transport};

type Handler = dyn Fn(&str, &Query) -> Result<ApiResponse> + Send + Sync;

/// In-memory [`Transport`] for tests: answers from a handler closure and
/// records every request it sees.
pub(crate) struct FakeTransport {
    handler: Box<Handler>,
    requests: Mutex<Vec<(String, Query)>>,
}

impl FakeTransport {
    pub(crate) fn new<H>(handler: H) -> Arc<Self>
        where H: Fn(&str, &Query) -> Result<ApiResponse> + Send + Sync + 'static
    {
        Arc::new(FakeTransport {
            handler: Box::new(handler),
            requests: Mutex::new(vec![]),
        })
    }

    pub(crate) fn requests(&self) -> Vec<(String, Query)> {
        self.requests.lock().clone()
    }
}

impl fmt::Debug for FakeTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FakeTransport")
            .field("requests", &self.requests.lock().len())
            .finish()
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn get(&self, endpoint: &str, query: &Query) -> Result<ApiResponse> {
        self.requests.lock().push((endpoint.into(), query.clone()));
        (self.handler)(endpoint, query)
    }
}
