pub(crate) use anyhow::{Context as _, Result, bail};
pub(crate) use tracing::{debug, info, trace, warn};
