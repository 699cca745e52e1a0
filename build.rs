use std::{fs::File, path::Path};

const CLIENT_PATH: &str = "res/client";

// Packs the browser client so the binary can unpack and serve it at runtime
fn main() {
    println!("cargo:rerun-if-changed={CLIENT_PATH}");

    let out_dir = std::env::var("OUT_DIR").expect("OUT_DIR not set by cargo");
    let tarball_path = Path::new(&out_dir).join("client.tar");
    let tarball_writer = File::create(tarball_path).expect("Failed to create client tarball");

    let mut tarball = tar::Builder::new(tarball_writer);
    tarball
        .append_dir_all(".", CLIENT_PATH)
        .expect("Failed to add client files to tarball");
    tarball.finish().expect("Failed to finish client tarball");
}
