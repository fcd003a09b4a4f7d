// FFmpeg is linked dynamically; ffmpeg-next locates the libraries through
// pkg-config. Nothing to generate here.

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
}
