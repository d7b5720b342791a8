/// HTTP endpoint paths of the depot API.
pub mod endpoints {
    use depot_types::{PackageIdent, OriginKey};

    pub const DEPOT_PREFIX: &str = "/v1/depot";

    /// Paginated package listing of one channel.
    pub fn channel_packages(origin: &str, channel: &str) -> String {
        format!("{DEPOT_PREFIX}/channels/{origin}/{channel}/pkgs")
    }

    /// Package record; also the existence probe and the upload target.
    pub fn package(ident: &PackageIdent) -> String {
        format!("{DEPOT_PREFIX}/pkgs/{}", ident.to_path())
    }

    pub fn download(ident: &PackageIdent) -> String {
        format!("{DEPOT_PREFIX}/pkgs/{}/download", ident.to_path())
    }

    pub fn promote(channel: &str, ident: &PackageIdent) -> String {
        format!(
            "{DEPOT_PREFIX}/channels/{}/{}/pkgs/{}/{}/{}/promote",
            ident.origin, channel, ident.name, ident.version, ident.release
        )
    }

    pub fn origin_keys(origin: &str) -> String {
        format!("{DEPOT_PREFIX}/origins/{origin}/keys")
    }

    /// Import target for one key revision.
    pub fn origin_key(key: &OriginKey) -> String {
        format!("{DEPOT_PREFIX}/origins/{}/keys/{}", key.origin, key.revision)
    }

    /// Key material; `location` is the depot-relative path from the key listing.
    pub fn key_material(location: &str) -> String {
        format!("{DEPOT_PREFIX}{location}")
    }
}
