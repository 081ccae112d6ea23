pub(crate) mod dispatch_impl;
