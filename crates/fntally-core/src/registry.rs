//! Known function identifiers the harness reports on.
//!
//! Lookups are case-insensitive. Iteration follows match order: longest
//! name first, then lexicographic, so that `cache.invalidate` is tried
//! before `cache` and same-length collisions resolve the same way on every run.

use std::collections::HashSet;

// ─── Builtin list ────────────────────────────────────────────────

const BUILTIN_FUNCTIONS: &[&str] = &[
    // cache
    "cache.invalidate",
    "cache.iscached",
    "cache.replace",
    "cloneref",
    "compareinstances",
    // closures
    "checkcaller",
    "clonefunction",
    "getcallingscript",
    "getscriptclosure",
    "hookfunction",
    "iscclosure",
    "islclosure",
    "isexecutorclosure",
    "loadstring",
    "newcclosure",
    // console
    "rconsoleclear",
    "rconsolecreate",
    "rconsoledestroy",
    "rconsoleinput",
    "rconsoleprint",
    "rconsolesettitle",
    // crypt
    "crypt.base64encode",
    "crypt.base64decode",
    "crypt.encrypt",
    "crypt.decrypt",
    "crypt.generatebytes",
    "crypt.generatekey",
    "crypt.hash",
    "base64_encode",
    "base64_decode",
    // debug
    "debug.getconstant",
    "debug.getconstants",
    "debug.getinfo",
    "debug.getproto",
    "debug.getprotos",
    "debug.getstack",
    "debug.getupvalue",
    "debug.getupvalues",
    "debug.setconstant",
    "debug.setstack",
    "debug.setupvalue",
    // filesystem
    "readfile",
    "listfiles",
    "writefile",
    "makefolder",
    "appendfile",
    "isfile",
    "isfolder",
    "delfolder",
    "delfile",
    "loadfile",
    "dofile",
    // input
    "isrbxactive",
    "isgameactive",
    "mouse1click",
    "mouse1press",
    "mouse1release",
    "mouse2click",
    "mouse2press",
    "mouse2release",
    "mousemoveabs",
    "mousemoverel",
    "mousescroll",
    "keypress",
    "keyrelease",
    // instances
    "fireclickdetector",
    "fireproximityprompt",
    "firetouchinterest",
    "firesignal",
    "getcallbackvalue",
    "getconnections",
    "getcustomasset",
    "gethiddenproperty",
    "sethiddenproperty",
    "gethui",
    "getinstances",
    "getnilinstances",
    "isscriptable",
    "setscriptable",
    "getproperties",
    "gethiddenproperties",
    "isnetworkowner",
    "setsimulationradius",
    "getspecialinfo",
    "saveinstance",
    // metatable
    "getrawmetatable",
    "hookmetamethod",
    "getnamecallmethod",
    "setnamecallmethod",
    "isreadonly",
    "setrawmetatable",
    "setreadonly",
    "makereadonly",
    "makewriteable",
    // misc
    "identifyexecutor",
    "getexecutorname",
    "lz4compress",
    "lz4decompress",
    "messagebox",
    "queue_on_teleport",
    "request",
    "http_request",
    "setclipboard",
    "setrbxclipboard",
    "toclipboard",
    "setfpscap",
    "getfpscap",
    "decompile",
    // scripts
    "getgc",
    "getgenv",
    "getloadedmodules",
    "getrenv",
    "getreg",
    "getrunningscripts",
    "getscriptbytecode",
    "getscripthash",
    "getscripts",
    "getsenv",
    "getthreadidentity",
    "setthreadidentity",
    "getidentity",
    "setidentity",
    "getthreadcontext",
    "setthreadcontext",
    "getscriptfunction",
    // drawing
    "drawing.new",
    "drawing.fonts",
    "isrenderobj",
    "getrenderproperty",
    "setrenderproperty",
    "cleardrawcache",
    // websocket
    "websocket.connect",
    // aliases commonly reported separately
    "replaceclosure",
    "getsynasset",
    "dumpstring",
    "getprotos",
    "getupvalues",
    "getconstants",
];

// ─── Registry ────────────────────────────────────────────────────

/// Immutable set of lower-cased function names.
#[derive(Debug, Clone)]
pub struct FunctionRegistry {
    lookup: HashSet<String>,
    /// Same names in match order.
    ordered: Vec<String>,
}

impl FunctionRegistry {
    /// The fixed list of functions the harness is known to report.
    pub fn builtin() -> Self {
        Self::from_names(BUILTIN_FUNCTIONS.iter().copied())
    }

    /// Build a registry from arbitrary names. Names are trimmed and
    /// lower-cased; blanks and duplicates are dropped.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let lookup: HashSet<String> = names
            .into_iter()
            .map(|n| n.as_ref().trim().to_lowercase())
            .filter(|n| !n.is_empty())
            .collect();

        let mut ordered: Vec<String> = lookup.iter().cloned().collect();
        ordered.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));

        Self { lookup, ordered }
    }

    pub fn contains(&self, name: &str) -> bool {
        // Fast path for already-lowered input avoids an allocation.
        self.lookup.contains(name) || self.lookup.contains(&name.to_lowercase())
    }

    /// Names in match order (longest first, then lexicographic).
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.ordered.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
