/*
   Copyright The containerd Authors.

   Licensed under the Apache License, Version 2.0 (the "License");
   you may not use this file except in compliance with the License.
   You may obtain a copy of the License at

       http://www.apache.org/licenses/LICENSE-2.0

   Unless required by applicable law or agreed to in writing, software
   distributed under the License is distributed on an "AS IS" BASIS,
   WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
   See the License for the specific language governing permissions and
   limitations under the License.
*/

use tokio::task::spawn_blocking;

use crate::error::{Error, Result};
use crate::other_error;

/// Run a blocking syscall on the blocking thread pool.
pub(crate) async fn asyncify<F, T>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    spawn_blocking(f)
        .await
        .map_err(other_error!(e, "failed to spawn blocking task"))?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn propagates_the_closure_result() {
        assert_eq!(asyncify(|| Ok(3)).await.unwrap(), 3);

        let err = asyncify::<_, ()>(|| Err(Error::Unsupported)).await;
        assert!(matches!(err, Err(Error::Unsupported)));
    }
}
