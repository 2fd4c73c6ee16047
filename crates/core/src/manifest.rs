//! Compiled-in cache version and app shell manifest.
//!
//! These values are not runtime-configurable. Bumping [`CACHE_NAME`] is how a
//! new release invalidates every bucket written by an older one.

/// Name of the current cache bucket. Every other bucket is stale.
pub const CACHE_NAME: &str = "portal-web-cache-v4";

/// Page served for navigations when the network is unreachable.
pub const OFFLINE_URL: &str = "./index.html";

/// Assets fetched and stored as one batch at install time.
///
/// Relative entries resolve against the app scope; absolute entries are
/// cross-origin dependencies the shell cannot render without.
pub const ASSETS_TO_CACHE: &[&str] = &[
    "./",
    "./index.html",
    "./manifest.json",
    "./index.tsx",
    "https://cdn.tailwindcss.com",
    "https://cdnjs.cloudflare.com/ajax/libs/font-awesome/6.4.0/css/all.min.css",
    "https://fonts.googleapis.com/css2?family=Inter:wght@400;500;600;700;800&display=swap",
    "https://i.postimg.cc/gJzFByk5/file-0000000098b8720e9deb64f615033168.png",
    // ESM dependencies; without them the shell renders blank offline
    "https://esm.sh/react@19.2.3",
    "https://esm.sh/react-dom@19.2.3",
    "https://esm.sh/react-dom@19.2.3/client",
    "https://esm.sh/framer-motion@11.11.11?deps=react@19.2.3,react-dom@19.2.3",
    "https://esm.sh/lucide-react@0.454.0?deps=react@19.2.3",
    "https://esm.sh/@google/genai@1.37.0",
];
