fn main() {
    weibo_image_hound::cli::run();
}
