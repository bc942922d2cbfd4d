//! Lookup tables turning parser messages into suggestions.

/// Substring of a YAML syntax error paired with advice.
pub(crate) const YAML_HINTS: [(&str, &str); 5] = [
    (
        "did not find expected '-'",
        "Start list items with '-' and ensure proper indentation.",
    ),
    (
        "expected ':'",
        "Ensure each key is followed by ':' separating key and value.",
    ),
    (
        "mapping values are not allowed",
        "Check for a stray ':' or add quotes around values where needed.",
    ),
    (
        "found character that cannot start any token",
        "Remove stray characters and ensure indentation uses spaces (no tabs).",
    ),
    (
        "unknown escape character",
        "Use valid YAML escape sequences or quote the string.",
    ),
];

/// Substring of a schema error paired with advice.
pub(crate) const DATA_HINTS: [(&str, &str); 4] = [
    (
        "unknown field",
        "Check the key spelling; unknown keys are rejected.",
    ),
    (
        "unknown variant",
        "Target kinds are executable, shared_library, module_library, static_library, object_library, utility and global.",
    ),
    (
        "missing field `model_version`",
        "Declare the format version at the top, for example `model_version: 1.0.0`.",
    ),
    (
        "unexpected character",
        "Versions use semantic versioning, for example `1.0.0`.",
    ),
];
