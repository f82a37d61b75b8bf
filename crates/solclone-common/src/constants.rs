//! Placeholder grammar constants and run defaults.

/// Opening delimiter of a placeholder token.
pub const PLACEHOLDER_OPEN: &str = "{{";

/// Closing delimiter of a placeholder token.
pub const PLACEHOLDER_CLOSE: &str = "}}";

/// Separator between placeholder path segments.
pub const PATH_SEPARATOR: char = '.';

/// Dictionary property holding an item's new identifier.
pub const ITEM_ID: &str = "itemId";

/// Dictionary property holding an item's or layer's new url.
pub const URL: &str = "url";

/// Dictionary property holding an item's new name; also the trailing
/// segment of every field reference token.
pub const NAME: &str = "name";

/// Dictionary property holding a layer's field mapping.
pub const FIELDS: &str = "fields";

/// Prefix of the per-layer dictionary property (`layer0`, `layer1`, ...).
pub const LAYER_PREFIX: &str = "layer";

/// Dictionary property holding a layer's id.
pub const LAYER_ID: &str = "layerId";

/// Dictionary key supplying the deploy-time service extent.
pub const SOLUTION_EXTENT: &str = "solutionExtent";

/// Dictionary key supplying the deploy-time item (bounding box) extent.
pub const SOLUTION_ITEM_EXTENT: &str = "solutionItemExtent";

/// Item kind whose templates are treated as late-bound group targets.
pub const GROUP_KIND: &str = "Group";

/// Popup field-info prefix that references an expression, not a field.
pub const EXPRESSION_PREFIX: &str = "expression/";

/// Popup field-info prefix that references a field of a related table.
pub const RELATIONSHIPS_PREFIX: &str = "relationships/";

/// Default number of simultaneously in-flight item creations.
pub const DEFAULT_MAX_CONCURRENCY: usize = 4;

/// Application name used in CLI output.
pub const APP_NAME: &str = "solclone";

/// Binary name for the CLI.
pub const BIN_NAME: &str = "solclone";
