//! Code block language normalization.

use std::{
    collections::{HashMap, HashSet},
    sync::LazyLock,
};

use maplit::{hashmap, hashset};
use tracing::debug;

pub const PLAIN_TEXT: &str = "plain text";

/// Languages accepted by the workspace for code blocks.
static ACCEPTED: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    hashset! {
        "abap", "agda", "arduino", "ascii art", "assembly", "bash", "basic", "bnf", "c", "c#",
        "c++", "clojure", "coffeescript", "coq", "css", "dart", "dhall", "diff", "docker",
        "ebnf", "elixir", "elm", "erlang", "f#", "flow", "fortran", "gherkin", "glsl", "go",
        "graphql", "groovy", "haskell", "hcl", "html", "idris", "java", "javascript", "json",
        "julia", "kotlin", "latex", "less", "lisp", "livescript", "llvm ir", "lua", "makefile",
        "markdown", "markup", "matlab", "mathematica", "mermaid", "nix", "notion formula",
        "objective-c", "ocaml", "pascal", "perl", "php", "plain text", "powershell", "prolog",
        "protobuf", "purescript", "python", "r", "racket", "reason", "ruby", "rust", "sass",
        "scala", "scheme", "scss", "shell", "smalltalk", "solidity", "sql", "swift", "toml",
        "typescript", "vb.net", "verilog", "vhdl", "visual basic", "webassembly", "xml", "yaml",
        "java/c/c++/c#",
    }
});

/// Common fence tags and file extensions mapped to accepted languages.
static ALIASES: LazyLock<HashMap<&'static str, &'static str>> = LazyLock::new(|| {
    hashmap! {
        "" => PLAIN_TEXT,
        "text" => PLAIN_TEXT,
        "txt" => PLAIN_TEXT,
        "plain" => PLAIN_TEXT,
        "plaintext" => PLAIN_TEXT,
        "py" => "python",
        "python3" => "python",
        "pyi" => "python",
        "sh" => "shell",
        "zsh" => "shell",
        "console" => "shell",
        "shell-session" => "shell",
        "js" => "javascript",
        "jsx" => "javascript",
        "mjs" => "javascript",
        "cjs" => "javascript",
        "node" => "javascript",
        "ts" => "typescript",
        "tsx" => "typescript",
        "mts" => "typescript",
        "rs" => "rust",
        "rb" => "ruby",
        "yml" => "yaml",
        "md" => "markdown",
        "mdx" => "markdown",
        "cpp" => "c++",
        "cc" => "c++",
        "cxx" => "c++",
        "hpp" => "c++",
        "hh" => "c++",
        "h" => "c",
        "cs" => "c#",
        "csharp" => "c#",
        "fs" => "f#",
        "fsharp" => "f#",
        "kt" => "kotlin",
        "kts" => "kotlin",
        "dockerfile" => "docker",
        "tf" => "hcl",
        "terraform" => "hcl",
        "ps1" => "powershell",
        "psm1" => "powershell",
        "objc" => "objective-c",
        "golang" => "go",
        "htm" => "html",
        "vue" => "html",
        "svelte" => "html",
        "proto" => "protobuf",
        "ex" => "elixir",
        "exs" => "elixir",
        "erl" => "erlang",
        "hs" => "haskell",
        "ml" => "ocaml",
        "clj" => "clojure",
        "cljs" => "clojure",
        "scm" => "scheme",
        "rkt" => "racket",
        "pl" => "perl",
        "pm" => "perl",
        "jl" => "julia",
        "mk" => "makefile",
        "make" => "makefile",
        "tex" => "latex",
        "gql" => "graphql",
        "sol" => "solidity",
        "wasm" => "webassembly",
        "wat" => "webassembly",
        "vb" => "visual basic",
        "v" => "verilog",
        "asm" => "assembly",
        "s" => "assembly",
        "patch" => "diff",
        "svg" => "xml",
        "xsd" => "xml",
        "jsonc" => "json",
        "json5" => "json",
        "mmd" => "mermaid",
        "coffee" => "coffeescript",
        "ino" => "arduino",
        "m" => "objective-c",
        "f90" => "fortran",
        "pas" => "pascal",
        "feature" => "gherkin",
        "frag" => "glsl",
        "vert" => "glsl",
        "res" => "reason",
        "re" => "reason",
        "purs" => "purescript",
    }
});

/// Maps a fence tag (or a file extension) to a language the workspace
/// accepts. Total: unknown input becomes [`PLAIN_TEXT`].
pub fn normalize(tag: &str) -> String {
    let key = tag.trim().to_lowercase();
    if let Some(language) = ALIASES.get(key.as_str()) {
        return (*language).to_owned();
    }
    if ACCEPTED.contains(key.as_str()) {
        return key;
    }
    debug!(tag, "unknown code language, using plain text");
    crate::warn_entry!("unknown code language {tag:?}, using plain text");
    PLAIN_TEXT.to_owned()
}

pub fn is_accepted(language: &str) -> bool {
    ACCEPTED.contains(language)
}
