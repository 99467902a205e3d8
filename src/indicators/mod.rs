// =============================================================================
// Technical Indicators Module
// =============================================================================
//
// Pure, side-effect-free indicator implementations.  Every public function
// returns `Option<T>` so callers are forced to handle insufficient-data and
// numerical-edge-case scenarios.

pub mod adx;
