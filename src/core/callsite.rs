//! Call-site resolution
//!
//! Resolving the source location of a log call is a debugging aid, not an exact
//! unwind. The default [`CallSiteSource::Caller`] uses `#[track_caller]` and is
//! exact. [`CallSiteSource::Backtrace`] walks a captured backtrace and depends on
//! debug info and inlining decisions; when nothing usable is found the record is
//! simply rendered without a call-site tag.

use regex::Regex;
use std::backtrace::Backtrace;
use std::panic::Location;
use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;

/// Facade frames sitting between the capture point and the caller:
/// the resolver, the logger dispatch and the leveled method.
pub const INTERNAL_FRAMES: usize = 3;

/// `at <method> (<path>:<line>:<col>)`
static FRAME_WITH_METHOD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^at\s+(.*?)\s+\((.*):(\d+):(\d+)\)$").expect("Invalid frame regex")
});

/// `at <path>:<line>:<col>`
static FRAME_LOCATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^at\s+(.*):(\d+):(\d+)$").expect("Invalid location regex"));

/// `<n>: <symbol>` as printed by `std::backtrace::Backtrace`
static FRAME_SYMBOL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+:\s+(.+)$").expect("Invalid symbol regex"));

/// Symbol prefixes of the backtrace capture machinery
const CAPTURE_PREFIXES: &[&str] = &["std::backtrace", "backtrace::", "std::sys"];

/// Source location of a log call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSite {
    pub method: Option<String>,
    pub absolute_path: PathBuf,
    pub relative_path: String,
    pub line: u32,
    pub column: u32,
    pub raw_stack: String,
}

impl CallSite {
    /// `[relative_path:line:column]`
    pub fn tag(&self) -> String {
        format!("[{}:{}:{}]", self.relative_path, self.line, self.column)
    }
}

/// One parsed stack frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackFrame {
    pub method: Option<String>,
    pub path: String,
    pub line: u32,
    pub column: u32,
}

/// How the logger obtains call sites
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CallSiteSource {
    /// Location of the `#[track_caller]` call chain
    #[default]
    Caller,
    /// Frame `depth` of a captured backtrace, after the internal frames
    Backtrace { depth: usize },
    /// Never resolve
    Disabled,
}

/// Parse stack text into located frames
///
/// Lines that carry no `path:line:col` location do not produce frames; a
/// numbered symbol line names the method of the location line following it.
pub fn parse_frames(stack: &str) -> Vec<StackFrame> {
    let mut frames = Vec::new();
    let mut pending_method: Option<String> = None;

    for line in stack.lines().map(str::trim) {
        if let Some(caps) = FRAME_WITH_METHOD.captures(line) {
            let (Ok(line_no), Ok(column)) = (caps[3].parse(), caps[4].parse()) else {
                continue;
            };
            pending_method = None;
            frames.push(StackFrame {
                method: Some(caps[1].to_string()),
                path: caps[2].to_string(),
                line: line_no,
                column,
            });
        } else if let Some(caps) = FRAME_LOCATION.captures(line) {
            let (Ok(line_no), Ok(column)) = (caps[2].parse(), caps[3].parse()) else {
                continue;
            };
            frames.push(StackFrame {
                method: pending_method.take(),
                path: caps[1].to_string(),
                line: line_no,
                column,
            });
        } else if let Some(caps) = FRAME_SYMBOL.captures(line) {
            pending_method = Some(caps[1].trim().to_string());
        }
    }

    frames
}

/// Turns stacks and caller locations into [`CallSite`]s
#[derive(Debug, Clone)]
pub struct CallSiteResolver {
    project_root: PathBuf,
    source: CallSiteSource,
}

impl CallSiteResolver {
    /// Resolver rooted at the current working directory
    pub fn new(source: CallSiteSource) -> Self {
        let root = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self::with_root(source, root)
    }

    /// Resolver with an explicit project root
    pub fn with_root(source: CallSiteSource, root: impl AsRef<Path>) -> Self {
        Self {
            project_root: absolutize(root.as_ref()),
            source,
        }
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    pub fn source(&self) -> CallSiteSource {
        self.source
    }

    /// Resolve the call site of the log call currently being made
    ///
    /// `caller` is the `#[track_caller]` location captured by the facade.
    #[inline(never)]
    pub fn resolve(&self, caller: &'static Location<'static>) -> Option<CallSite> {
        match self.source {
            CallSiteSource::Caller => Some(self.from_location(caller)),
            CallSiteSource::Backtrace { depth } => {
                let stack = Backtrace::force_capture().to_string();
                self.resolve_stack(&stack, depth)
            }
            CallSiteSource::Disabled => None,
        }
    }

    /// Resolve a call site from stack text
    ///
    /// Leading capture-machinery frames and the [`INTERNAL_FRAMES`] facade
    /// frames are dropped, then the frame at `skip` is selected, falling back
    /// to the first remaining frame when `skip` is out of range.
    pub fn resolve_stack(&self, stack: &str, skip: usize) -> Option<CallSite> {
        let frames = parse_frames(stack);
        let first_user = frames
            .iter()
            .position(|frame| !is_capture_frame(frame))
            .unwrap_or(frames.len());
        let remaining = frames.get(first_user + INTERNAL_FRAMES..)?;

        let frame = remaining.get(skip).or_else(|| remaining.first())?;
        Some(self.build(
            frame.method.clone(),
            Path::new(&frame.path),
            frame.line,
            frame.column,
            stack.to_string(),
        ))
    }

    /// Call site for a `#[track_caller]` location
    pub fn from_location(&self, location: &Location<'_>) -> CallSite {
        let raw = format!(
            "at {}:{}:{}",
            location.file(),
            location.line(),
            location.column()
        );
        self.build(
            None,
            Path::new(location.file()),
            location.line(),
            location.column(),
            raw,
        )
    }

    fn build(
        &self,
        method: Option<String>,
        path: &Path,
        line: u32,
        column: u32,
        raw_stack: String,
    ) -> CallSite {
        let absolute_path = absolutize(path);
        let relative_path = absolute_path
            .strip_prefix(&self.project_root)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| absolute_path.clone());

        CallSite {
            method: method.filter(|m| !m.is_empty()),
            relative_path: relative_path.to_string_lossy().replace('\\', "/"),
            absolute_path,
            line,
            column,
            raw_stack,
        }
    }
}

impl Default for CallSiteResolver {
    fn default() -> Self {
        Self::new(CallSiteSource::default())
    }
}

fn is_capture_frame(frame: &StackFrame) -> bool {
    frame
        .method
        .as_deref()
        .is_some_and(|m| CAPTURE_PREFIXES.iter().any(|prefix| m.starts_with(prefix)))
}

/// Join relative paths onto the working directory and drop `.`/`..` parts
fn absolutize(path: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("/"))
            .join(path)
    };

    let mut normalized = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;

    const JS_STACK: &str = "Error
    at Logger._getStackInfo (/srv/app/lib/logger.js:10:5)
    at Logger._makeLog (/srv/app/lib/logger.js:20:7)
    at Logger.info (/srv/app/lib/logger.js:30:9)
    at handler (/srv/app/routes/users.js:42:13)
    at /srv/app/server.js:7:3";

    const RUST_STACK: &str = "   0: std::backtrace::Backtrace::force_capture
             at /rustc/abc/library/std/src/backtrace.rs:310:13
   1: demo::core::callsite::CallSiteResolver::resolve
             at ./src/core/callsite.rs:150:29
   2: demo::core::logger::Logger::emit
             at ./src/core/logger.rs:200:9
   3: demo::core::logger::Logger::info
             at ./src/core/logger.rs:300:9
   4: demo::handlers::create_user
             at ./src/handlers.rs:18:5
   5: main";

    fn resolver() -> CallSiteResolver {
        CallSiteResolver::with_root(CallSiteSource::Backtrace { depth: 0 }, "/srv/app")
    }

    #[test]
    fn test_parse_both_frame_shapes() {
        let frames = parse_frames(JS_STACK);
        assert_eq!(frames.len(), 5);
        assert_eq!(frames[3].method.as_deref(), Some("handler"));
        assert_eq!(frames[3].line, 42);
        assert_eq!(frames[4].method, None);
        assert_eq!(frames[4].path, "/srv/app/server.js");
        assert_eq!(frames[4].column, 3);
    }

    #[test]
    fn test_parse_rust_backtrace() {
        let frames = parse_frames(RUST_STACK);
        assert_eq!(frames.len(), 5);
        assert_eq!(frames[4].method.as_deref(), Some("demo::handlers::create_user"));
        assert_eq!(frames[4].path, "./src/handlers.rs");
    }

    #[test]
    fn test_resolve_skips_internal_frames() {
        let site = resolver().resolve_stack(JS_STACK, 0).unwrap();
        assert_eq!(site.relative_path, "routes/users.js");
        assert_eq!(site.line, 42);
        assert_eq!(site.column, 13);
        assert_eq!(site.method.as_deref(), Some("handler"));
        assert_eq!(site.tag(), "[routes/users.js:42:13]");
    }

    #[test]
    fn test_resolve_honors_skip() {
        let site = resolver().resolve_stack(JS_STACK, 1).unwrap();
        assert_eq!(site.relative_path, "server.js");
        assert_eq!(site.method, None);
    }

    #[test]
    fn test_resolve_out_of_range_falls_back_to_first() {
        let site = resolver().resolve_stack(JS_STACK, 10).unwrap();
        assert_eq!(site.relative_path, "routes/users.js");
    }

    #[test]
    fn test_resolve_drops_capture_frames() {
        let root = std::env::current_dir().unwrap();
        let resolver = CallSiteResolver::with_root(CallSiteSource::Backtrace { depth: 0 }, &root);
        let site = resolver.resolve_stack(RUST_STACK, 0).unwrap();
        assert_eq!(site.relative_path, "src/handlers.rs");
        assert_eq!(site.line, 18);
    }

    #[test]
    fn test_unmatched_stack_is_none() {
        assert!(resolver().resolve_stack("no frames here", 0).is_none());
        assert!(resolver().resolve_stack("", 0).is_none());
    }

    #[test]
    fn test_path_outside_root_kept_absolute() {
        let stack = "at f (/x.js:1:1)\nat g (/x.js:1:1)\nat h (/x.js:1:1)\nat /opt/lib/x.js:1:2";
        let site = resolver().resolve_stack(stack, 0).unwrap();
        assert_eq!(site.relative_path, "/opt/lib/x.js");
    }

    #[test]
    fn test_caller_location() {
        let root = std::env::current_dir().unwrap();
        let resolver = CallSiteResolver::with_root(CallSiteSource::Caller, &root);
        let site = resolver.resolve(Location::caller()).unwrap();
        assert!(site.relative_path.ends_with("callsite.rs"));
        assert!(site.line > 0);
        assert!(site.column > 0);
        assert!(site.raw_stack.starts_with("at "));
    }

    #[test]
    fn test_disabled_source() {
        let resolver = CallSiteResolver::with_root(CallSiteSource::Disabled, "/");
        assert!(resolver.resolve(Location::caller()).is_none());
    }

    #[test]
    fn test_absolutize_normalizes() {
        assert_eq!(
            absolutize(Path::new("/srv/app/./lib/../routes/a.js")),
            PathBuf::from("/srv/app/routes/a.js")
        );
    }
}
