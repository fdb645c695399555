fn main() {
    std::process::exit(pr_feedback::run());
}
